//! 适配器运行参数

use std::time::Duration;

/// 默认单次操作超时
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// 适配器选项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdapterOptions {
    /// 每次操作的超时
    pub timeout: Duration,
    /// 初始过滤标记，为 true 时引擎跳过自动加载且禁止整体保存
    pub filtered: bool,
}

impl Default for AdapterOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            filtered: false,
        }
    }
}

impl AdapterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置超时
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// 设置初始过滤标记
    pub fn with_filtered(mut self, filtered: bool) -> Self {
        self.filtered = filtered;
        self
    }
}
