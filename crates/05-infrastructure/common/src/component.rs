//! 组件描述信息
//!
//! 注册到容器中的组件定义的只读视图，用于查询和诊断

use crate::lifecycle::Lifetime;
use crate::metadata::TypeInfo;
use serde::Serialize;

/// 组件描述符
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentDescriptor {
    /// 组件名称
    pub name: String,
    /// 组件实例类型
    pub type_info: TypeInfo,
    /// 组件生命周期
    pub lifetime: Lifetime,
    /// 直接注入的依赖名称（按声明顺序）
    pub dependencies: Vec<String>,
    /// 通过 provider 延迟获取的依赖名称
    pub provided_dependencies: Vec<String>,
    /// 限定符
    pub qualifiers: Vec<String>,
    /// 多个候选时是否优先
    pub primary: bool,
    /// 是否延迟创建（不参与容器刷新时的预实例化）
    pub lazy: bool,
    /// 初始化方法名称
    pub init_method: Option<String>,
    /// 销毁方法名称
    pub destroy_method: Option<String>,
    /// 注册顺序
    pub registration_index: usize,
}
