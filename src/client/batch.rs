//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 批量拉取：按位置或按标签对多个资源并发执行 `fetch`。

use super::{FetchResult, Fetcher, ServerRefresh};
use crate::error::Result;
use crate::overlay::DataGraph;
use futures::future::join_all;
use indexmap::IndexMap;
use serde_json::Value;
use tracing::instrument;

/// 按标签分组的拉取结果
#[derive(Debug, Clone, Default)]
pub struct GroupedFetch {
    /// 标签 -> 立即可用的数据
    pub data: IndexMap<String, Value>,
    /// 标签 -> 进行中的后台刷新（缓存未命中的资源为None）
    pub server: IndexMap<String, Option<ServerRefresh>>,
}

impl GroupedFetch {
    /// 构建数据图：数据放在根部，进行中的刷新作为 `server` 下的待定值
    pub fn into_graph(self) -> DataGraph {
        let mut graph = DataGraph::new();
        for (label, value) in self.data {
            graph.insert(label, value);
        }
        for (label, server) in self.server {
            if let Some(refresh) = server {
                graph.insert_pending(label, refresh);
            }
        }
        graph
    }
}

impl Fetcher {
    /// 并发拉取多个资源
    ///
    /// 结果与输入按位置一一对应。等待所有拉取结束后返回；
    /// 任一资源失败时，按输入顺序的第一个错误作为整体错误。
    #[instrument(skip(self, resource_ids), level = "debug", fields(service = %self.name))]
    pub async fn fetch_all<I, S>(&self, resource_ids: I) -> Result<Vec<FetchResult>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.fetch_all_settled(resource_ids)
            .await
            .into_iter()
            .collect()
    }

    /// 并发拉取多个资源，单个资源的失败相互隔离
    pub async fn fetch_all_settled<I, S>(&self, resource_ids: I) -> Vec<Result<FetchResult>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let ids: Vec<String> = resource_ids
            .into_iter()
            .map(|id| id.as_ref().to_string())
            .collect();
        join_all(ids.iter().map(|id| self.fetch(id))).await
    }

    /// 并发拉取并按调用方的标签分组
    ///
    /// 标签顺序保持不变，每个资源的后台刷新句柄单独保留，供调用方稍后等待
    #[instrument(skip(self, labelled), level = "debug", fields(service = %self.name))]
    pub async fn fetch_and_group<I, L, S>(&self, labelled: I) -> Result<GroupedFetch>
    where
        I: IntoIterator<Item = (L, S)>,
        L: Into<String>,
        S: AsRef<str>,
    {
        let (labels, ids): (Vec<String>, Vec<String>) = labelled
            .into_iter()
            .map(|(label, id)| (label.into(), id.as_ref().to_string()))
            .unzip();

        let responses = self.fetch_all(&ids).await?;

        let mut grouped = GroupedFetch::default();
        for (label, response) in labels.into_iter().zip(responses) {
            let (data, server) = response.into_parts();
            grouped.data.insert(label.clone(), data);
            grouped.server.insert(label, server);
        }
        Ok(grouped)
    }
}
