//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 延迟覆盖解析器。
//!
//! 展示层先同步读取数据图中的当前值；若对应的 `server.<section>` 有数据
//! （或仍在刷新中），则在后台等待它完成，把结果写回数据图，
//! 再用 `server.<path>` 处的值调用调用方提供的 setter。

pub mod graph;
pub mod path;

pub use graph::{DataGraph, Slot, SERVER_KEY};
pub use path::Path;

use self::path::walk;

use crate::metrics::GLOBAL_METRICS;
use serde_json::Value;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

struct GraphState {
    graph: DataGraph,
    /// 每次 `set` 递增，旧图上的解析结果不会写入新图
    generation: u64,
}

/// 延迟覆盖解析器
///
/// 克隆得到的实例共享同一个数据图
#[derive(Clone)]
pub struct DataManager {
    state: Arc<RwLock<GraphState>>,
}

impl Default for DataManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DataManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.read();
        f.debug_struct("DataManager")
            .field("generation", &state.generation)
            .field("graph", &state.graph)
            .finish()
    }
}

impl DataManager {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(GraphState {
                graph: DataGraph::new(),
                generation: 0,
            })),
        }
    }

    /// 以给定数据图创建
    pub fn with_graph(graph: DataGraph) -> Self {
        let manager = Self::new();
        manager.set(graph);
        manager
    }

    fn read(&self) -> RwLockReadGuard<'_, GraphState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, GraphState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    /// 整体替换数据图
    pub fn set(&self, graph: DataGraph) {
        let mut state = self.write();
        state.graph = graph;
        state.generation += 1;
    }

    /// 当前数据图的副本
    pub fn snapshot(&self) -> DataGraph {
        self.read().graph.clone()
    }

    /// 同步查找路径，不存在时返回None
    pub fn resolve(&self, path: &str) -> Option<Value> {
        self.read().graph.resolve(&Path::parse(path))
    }

    /// 分区是否仍在等待后台刷新
    pub fn is_pending(&self, section: &str) -> bool {
        self.read()
            .graph
            .server_slot(section)
            .is_some_and(Slot::is_pending)
    }

    /// 读取路径当前的值，并订阅服务端数据
    ///
    /// 返回的 `Loaded` 携带调用时数据图中 `path` 处的值。若 `server.<section>` 有值，
    /// 会在后台任务中完成对账并最多调用一次 `setter`；`setter` 只会在
    /// `server.<path>` 处存在非空值时被调用。
    ///
    /// 后台任务可以提前等待刷新并写回数据图，但 `setter` 要等调用方丢弃
    /// `Loaded`（或调用 `into_value` / `release`）之后才会执行。
    pub fn load<F>(&self, path: &str, setter: F) -> Loaded
    where
        F: FnOnce(Value) + Send + 'static,
    {
        let path = Path::parse(path);
        let (value, slot, generation) = {
            let state = self.read();
            let value = state.graph.resolve(&path);
            let slot = state
                .graph
                .server_slot(path.section())
                .filter(|slot| slot.is_present())
                .cloned();
            (value, slot, state.generation)
        };

        let Some(slot) = slot else {
            return Loaded::immediate(value);
        };

        match Handle::try_current() {
            Ok(runtime) => {
                let manager = self.clone();
                let (gate, released) = oneshot::channel();
                GLOBAL_METRICS.record_request("overlay", "overlay", "load", "deferred");
                let handle = runtime.spawn(async move {
                    manager
                        .reconcile(path, slot, generation, released, setter)
                        .await;
                });
                Loaded {
                    value,
                    gate: Some(gate),
                    handle: Some(handle),
                }
            }
            Err(_) => {
                warn!(
                    "No Tokio runtime available, skipping server data for {}",
                    path
                );
                Loaded::immediate(value)
            }
        }
    }

    /// 等待服务端数据，调用方释放后再调用 setter
    #[instrument(skip(self, path, slot, released, setter), level = "debug", fields(path = %path))]
    async fn reconcile<F>(
        &self,
        path: Path,
        slot: Slot,
        generation: u64,
        released: oneshot::Receiver<()>,
        setter: F,
    ) where
        F: FnOnce(Value) + Send + 'static,
    {
        let section = path.section().to_string();
        let section_value = match slot {
            Slot::Resolved(v) => v,
            Slot::Pending(refresh) => match refresh.await {
                Ok(v) => {
                    let mut state = self.write();
                    if state.generation == generation {
                        state.graph.set_slot(&section, Slot::Resolved(v.clone()));
                    } else {
                        debug!("graph replaced while waiting, resolved value not cached");
                    }
                    v
                }
                Err(e) => {
                    GLOBAL_METRICS.record_request("overlay", "overlay", "load", "error");
                    warn!("Server data for section {} failed: {}", section, e);
                    return;
                }
            },
        };

        // 发送端被丢弃即视为释放
        let _ = released.await;

        match walk(&section_value, path.rest()) {
            Some(value) if !value.is_null() => {
                GLOBAL_METRICS.record_request("overlay", "overlay", "load", "applied");
                setter(value.clone());
            }
            _ => {
                debug!("no server value at {}", path);
            }
        }
    }
}

/// `load` 的返回值
///
/// 解引用得到调用时的当前值。持有期间 setter 不会执行；
/// 丢弃它、调用 `into_value` 或 `release` 后才放行。
#[derive(Debug)]
pub struct Loaded {
    value: Option<Value>,
    gate: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Loaded {
    fn immediate(value: Option<Value>) -> Self {
        Self {
            value,
            gate: None,
            handle: None,
        }
    }

    /// 是否安排了后台对账
    pub fn is_deferred(&self) -> bool {
        self.handle.is_some()
    }

    /// 取出当前值并放行 setter
    pub fn into_value(self) -> Option<Value> {
        self.value
    }

    /// 放行 setter，返回后台对账任务的句柄（没有服务端数据时为None）
    pub fn release(mut self) -> Option<JoinHandle<()>> {
        if let Some(gate) = self.gate.take() {
            let _ = gate.send(());
        }
        self.handle.take()
    }
}

impl std::ops::Deref for Loaded {
    type Target = Option<Value>;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}
