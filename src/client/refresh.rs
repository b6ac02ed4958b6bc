//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 后台刷新句柄。

use crate::error::{FetchError, Result};
use futures::future::{BoxFuture, FutureExt, Shared};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// 后台刷新句柄
///
/// 包装一个已经在Tokio上运行的刷新任务。句柄可以克隆，所有克隆观察到同一个结果。
/// 不支持取消：丢弃全部句柄后任务仍会执行到结束。
#[derive(Clone)]
pub struct ServerRefresh {
    inner: Shared<BoxFuture<'static, Result<Value>>>,
}

impl ServerRefresh {
    /// 在当前运行时上启动刷新任务
    pub fn spawn<F>(fut: F) -> Self
    where
        F: Future<Output = Result<Value>> + Send + 'static,
    {
        let handle = tokio::spawn(fut);
        let inner = async move {
            match handle.await {
                Ok(result) => result,
                Err(e) => Err(FetchError::from(e)),
            }
        }
        .boxed()
        .shared();
        Self { inner }
    }

    /// 已有结果的句柄
    pub fn ready(result: Result<Value>) -> Self {
        Self {
            inner: futures::future::ready(result).boxed().shared(),
        }
    }

    /// 已经被轮询得到的结果
    ///
    /// 任务完成但还没有任何句柄被等待过时返回None
    pub fn peek(&self) -> Option<&Result<Value>> {
        self.inner.peek()
    }
}

impl std::fmt::Debug for ServerRefresh {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self.peek() {
            None => "pending",
            Some(Ok(_)) => "resolved",
            Some(Err(_)) => "failed",
        };
        f.debug_struct("ServerRefresh").field("state", &state).finish()
    }
}

impl Future for ServerRefresh {
    type Output = Result<Value>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.inner).poll(cx)
    }
}
