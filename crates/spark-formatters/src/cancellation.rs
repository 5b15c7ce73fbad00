use tokio_util::sync::CancellationToken;

/// 请求级取消信号，统一表达“客户端已断开，停止写出”的契约。
///
/// # 逻辑解析（How）
/// - 内部包装 [`CancellationToken`]，克隆后的实例共享同一状态；
/// - `cancel` 在首次触发时返回 `true`，重复调用返回 `false`；
/// - `cancelled` 返回可 `await` 的 Future，供写出循环在 `select!` 中观察。
///
/// # 契约说明（What）
/// - **前置条件**：宿主为每个请求创建一个实例，并在连接中止时调用 `cancel`；
/// - **后置条件**：一旦取消，`is_cancelled` 对所有克隆可见。
#[derive(Clone, Debug, Default)]
pub struct RequestAborted {
    token: CancellationToken,
}

impl RequestAborted {
    /// 创建处于“未取消”状态的信号。
    pub fn new() -> Self {
        Self::default()
    }

    /// 是否已取消。
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// 标记取消。
    pub fn cancel(&self) -> bool {
        if self.token.is_cancelled() {
            return false;
        }
        self.token.cancel();
        true
    }

    /// 派生子信号：父信号取消时子信号随之取消，反之不影响父信号。
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
        }
    }

    /// 等待取消发生。
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }
}
