//! 进程级初始化与会话入口.
//!
//! 被包装库需要在首次使用前完成一次性的全局初始化 (编解码器注册、日志级别).
//! 这里把它建模为显式步骤: 先 [`HwContext::init`], 再通过上下文打开会话.
//! `init` 是幂等的, 可以在任意线程多次调用.

use hvd_core::{HvdConfig, HvdResult};
use log::debug;

use crate::backend::HwBackend;
use crate::session::Session;

/// 已完成全局初始化的后端
#[derive(Debug, Clone)]
pub struct HwContext<B: HwBackend> {
    backend: B,
}

impl<B: HwBackend> HwContext<B> {
    /// 执行后端的进程级初始化
    pub fn init(backend: B) -> HvdResult<Self> {
        backend.initialize()?;
        debug!("hvd: 后端 {} 已初始化", backend.name());
        Ok(Self { backend })
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// 按配置创建解码会话
    ///
    /// 失败时已分配的资源全部释放, 错误信息中包含出错的后端/解码器/格式名称.
    pub fn open(&self, config: &HvdConfig) -> HvdResult<Session<B>> {
        Session::open(self.backend.clone(), config)
    }
}
