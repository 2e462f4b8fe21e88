//! 实例缓存
//!
//! 单例缓存和每个作用域的缓存共用同一实现：每个组件名称一个 once-cell 槽位，
//! 保证并发首次解析时只构造一次；另有一份按创建顺序记录的实例日志，用于销毁。

use dashmap::DashMap;
use di_abstractions::{AnyInstance, ComponentDefinition, DestroyOrder, LifecycleHook};
use infrastructure_common::{DestroyFailure, LifecycleState};
use parking_lot::Mutex;
use std::cmp::Reverse;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

/// 已实现的组件实例
pub(crate) struct InstanceRecord {
    name: String,
    registration_index: usize,
    instance: AnyInstance,
    destroy_hook: Option<LifecycleHook>,
    state: LifecycleState,
}

impl InstanceRecord {
    /// 为已完成初始化的实例创建记录
    pub(crate) fn initialized(
        definition: &ComponentDefinition,
        registration_index: usize,
        instance: AnyInstance,
    ) -> Self {
        Self {
            name: definition.name().to_string(),
            registration_index,
            instance,
            destroy_hook: definition.destroy_hook().cloned(),
            state: LifecycleState::Initialized,
        }
    }

    /// 执行销毁回调，每个实例最多一次
    pub(crate) fn destroy(&mut self) -> Result<(), DestroyFailure> {
        if self.state == LifecycleState::Destroyed {
            return Ok(());
        }
        self.state = LifecycleState::Destroyed;

        let Some(hook) = &self.destroy_hook else {
            return Ok(());
        };

        debug!("销毁组件: {}.{}", self.name, hook.method());
        hook.invoke(&self.instance).map_err(|source| DestroyFailure {
            component: self.name.clone(),
            hook: hook.method().to_string(),
            source,
        })
    }
}

#[derive(Default)]
struct RecordLog {
    records: Vec<InstanceRecord>,
    closed: bool,
}

/// 实例缓存
pub(crate) struct InstanceCache {
    label: String,
    slots: DashMap<String, Arc<OnceCell<AnyInstance>>>,
    log: Mutex<RecordLog>,
}

impl InstanceCache {
    pub(crate) fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            slots: DashMap::new(),
            log: Mutex::new(RecordLog::default()),
        }
    }

    /// 获取组件的构造槽位，不存在时创建
    pub(crate) fn slot(&self, name: &str) -> Arc<OnceCell<AnyInstance>> {
        if let Some(slot) = self.slots.get(name) {
            return slot.clone();
        }
        self.slots.entry(name.to_string()).or_default().clone()
    }

    /// 已缓存的实例
    pub(crate) fn cached(&self, name: &str) -> Option<AnyInstance> {
        self.slots.get(name).and_then(|slot| slot.get().cloned())
    }

    /// 记录新实例；缓存已关闭时退回记录
    pub(crate) fn track(&self, record: InstanceRecord) -> Result<(), InstanceRecord> {
        let mut log = self.log.lock();
        if log.closed {
            return Err(record);
        }
        log.records.push(record);
        Ok(())
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.log.lock().closed
    }

    /// 存活实例数量
    pub(crate) fn live_count(&self) -> usize {
        self.log.lock().records.len()
    }

    /// 关闭缓存并按指定顺序销毁全部实例
    ///
    /// 单个回调失败不影响其余回调，失败记录全部返回。重复关闭返回空列表。
    pub(crate) fn close(&self, order: DestroyOrder) -> Vec<DestroyFailure> {
        let mut records = {
            let mut log = self.log.lock();
            if log.closed {
                return Vec::new();
            }
            log.closed = true;
            std::mem::take(&mut log.records)
        };
        self.slots.clear();

        match order {
            DestroyOrder::ReverseCreation => records.reverse(),
            DestroyOrder::ReverseRegistration => {
                records.sort_by_key(|record| Reverse(record.registration_index));
            }
        }

        debug!("关闭缓存 {}: 销毁 {} 个实例", self.label, records.len());

        let mut failures = Vec::new();
        for record in &mut records {
            if let Err(failure) = record.destroy() {
                warn!("销毁回调失败 ({}): {}", self.label, failure);
                failures.push(failure);
            }
        }
        failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use di_abstractions::ComponentDefinition;
    use parking_lot::Mutex as SyncMutex;

    type Journal = Arc<SyncMutex<Vec<String>>>;

    fn record(name: &str, index: usize, journal: &Journal, fail: bool) -> InstanceRecord {
        let journal = journal.clone();
        let label = name.to_string();
        let definition = ComponentDefinition::singleton(name, |_| Ok(()))
            .with_destroy_method("close", move |_: &()| {
                journal.lock().push(label.clone());
                if fail {
                    return Err("close failed".into());
                }
                Ok(())
            })
            .build();
        InstanceRecord::initialized(&definition, index, Arc::new(()))
    }

    #[test]
    fn close_destroys_in_reverse_creation_order_and_collects_failures() {
        let journal: Journal = Arc::default();
        let cache = InstanceCache::new("test");
        for (index, name) in ["a", "b", "c"].iter().enumerate() {
            assert!(cache.track(record(name, index, &journal, *name == "b")).is_ok());
        }
        assert_eq!(cache.live_count(), 3);

        let failures = cache.close(DestroyOrder::ReverseCreation);
        assert_eq!(*journal.lock(), vec!["c", "b", "a"]);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].component, "b");
        assert_eq!(failures[0].hook, "close");

        assert!(cache.is_closed());
        assert_eq!(cache.live_count(), 0);
        assert!(cache.close(DestroyOrder::ReverseCreation).is_empty());
    }

    #[test]
    fn close_can_follow_registration_order() {
        let journal: Journal = Arc::default();
        let cache = InstanceCache::new("test");
        // 创建顺序与注册顺序相反
        assert!(cache.track(record("late", 2, &journal, false)).is_ok());
        assert!(cache.track(record("early", 0, &journal, false)).is_ok());
        assert!(cache.track(record("middle", 1, &journal, false)).is_ok());

        cache.close(DestroyOrder::ReverseRegistration);
        assert_eq!(*journal.lock(), vec!["late", "middle", "early"]);
    }

    #[test]
    fn closed_cache_rejects_new_records() {
        let journal: Journal = Arc::default();
        let cache = InstanceCache::new("test");
        cache.close(DestroyOrder::ReverseCreation);

        let mut rejected = cache.track(record("a", 0, &journal, false)).unwrap_err();
        assert!(rejected.destroy().is_ok());
        // 第二次销毁不会再次调用回调
        assert!(rejected.destroy().is_ok());
        assert_eq!(*journal.lock(), vec!["a"]);
    }

    #[tokio::test]
    async fn slot_is_shared_per_name() {
        let cache = InstanceCache::new("test");
        let first = cache.slot("repository");
        let second = cache.slot("repository");
        assert!(Arc::ptr_eq(&first, &second));

        assert!(cache.cached("repository").is_none());
        first
            .get_or_init(|| async { Arc::new(7_u32) as AnyInstance })
            .await;
        let cached = cache.cached("repository").unwrap();
        assert_eq!(cached.downcast_ref::<u32>(), Some(&7));
    }
}
