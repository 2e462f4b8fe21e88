//! 依赖图与循环依赖检测
//!
//! 只包含构造前注入的依赖；provider 依赖在使用时才解析，不构成构造期的环

use infrastructure_common::DependencyError;
use std::collections::{HashMap, HashSet};

/// 依赖图节点
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyGraphNode {
    /// 组件名称
    pub name: String,
    /// 依赖的组件名称（已解析限定符）
    pub dependencies: Vec<String>,
}

impl DependencyGraphNode {
    pub fn new(name: impl Into<String>, dependencies: Vec<String>) -> Self {
        Self {
            name: name.into(),
            dependencies,
        }
    }
}

/// 循环依赖检测器
pub trait CircularDependencyDetector: Send + Sync {
    /// 检测整个依赖图
    fn detect_circular_dependencies(&self, graph: &[DependencyGraphNode]) -> Result<(), DependencyError>;

    /// 只检测从指定组件可达的部分
    fn detect_from(&self, root: &str, graph: &[DependencyGraphNode]) -> Result<(), DependencyError>;
}

/// 默认循环依赖检测器
#[derive(Debug, Default)]
pub struct DefaultCircularDependencyDetector;

impl CircularDependencyDetector for DefaultCircularDependencyDetector {
    fn detect_circular_dependencies(&self, graph: &[DependencyGraphNode]) -> Result<(), DependencyError> {
        // 使用深度优先搜索检测循环依赖
        let index = index_graph(graph);
        let mut visited = HashSet::new();
        let mut visiting = Vec::new();

        for node in graph {
            if !visited.contains(node.name.as_str()) {
                self.dfs_check(&node.name, &index, &mut visited, &mut visiting)?;
            }
        }

        Ok(())
    }

    fn detect_from(&self, root: &str, graph: &[DependencyGraphNode]) -> Result<(), DependencyError> {
        let index = index_graph(graph);
        let mut visited = HashSet::new();
        let mut visiting = Vec::new();
        self.dfs_check(root, &index, &mut visited, &mut visiting)
    }
}

impl DefaultCircularDependencyDetector {
    fn dfs_check<'g>(
        &self,
        current: &'g str,
        graph: &HashMap<&'g str, &'g DependencyGraphNode>,
        visited: &mut HashSet<&'g str>,
        visiting: &mut Vec<&'g str>,
    ) -> Result<(), DependencyError> {
        if let Some(pos) = visiting.iter().position(|name| *name == current) {
            // 检测到循环依赖，只报告环上的部分
            let mut cycle: Vec<&str> = visiting[pos..].to_vec();
            cycle.push(current);
            return Err(DependencyError::CircularDependency {
                dependency_chain: cycle.join(" -> "),
            });
        }

        if visited.contains(current) {
            return Ok(());
        }

        visiting.push(current);

        // 未注册的依赖不在这里报告
        if let Some(node) = graph.get(current).copied() {
            for dep in &node.dependencies {
                self.dfs_check(dep, graph, visited, visiting)?;
            }
        }

        visiting.pop();
        visited.insert(current);

        Ok(())
    }
}

fn index_graph(graph: &[DependencyGraphNode]) -> HashMap<&str, &DependencyGraphNode> {
    graph.iter().map(|node| (node.name.as_str(), node)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(name: &str, deps: &[&str]) -> DependencyGraphNode {
        DependencyGraphNode::new(name, deps.iter().map(ToString::to_string).collect())
    }

    #[test]
    fn acyclic_graph_passes() {
        let graph = vec![
            node("orderService", &["memberRepository", "discountPolicy"]),
            node("memberService", &["memberRepository"]),
            node("memberRepository", &[]),
            node("discountPolicy", &[]),
        ];
        let detector = DefaultCircularDependencyDetector;
        assert!(detector.detect_circular_dependencies(&graph).is_ok());
        assert!(detector.detect_from("orderService", &graph).is_ok());
    }

    #[test]
    fn cycle_reports_only_the_loop() {
        let graph = vec![
            node("root", &["x"]),
            node("x", &["y"]),
            node("y", &["x"]),
        ];
        let err = DefaultCircularDependencyDetector
            .detect_from("root", &graph)
            .unwrap_err();
        match err {
            DependencyError::CircularDependency { dependency_chain } => {
                assert_eq!(dependency_chain, "x -> y -> x");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn detect_from_ignores_unreachable_cycles() {
        let graph = vec![node("a", &[]), node("x", &["y"]), node("y", &["x"])];
        let detector = DefaultCircularDependencyDetector;
        assert!(detector.detect_from("a", &graph).is_ok());
        assert!(detector.detect_circular_dependencies(&graph).is_err());
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let graph = vec![node("a", &["a"])];
        assert!(DefaultCircularDependencyDetector
            .detect_circular_dependencies(&graph)
            .is_err());
    }
}
