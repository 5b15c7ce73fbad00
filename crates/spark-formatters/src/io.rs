use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::cancellation::RequestAborted;
use crate::error::FormatterError;

/// 单次写出的分块大小。
pub const WRITE_CHUNK_SIZE: usize = 16 * 1024;

/// 分块写出 `payload` 并在块之间观察取消信号。
///
/// # 逻辑解析（How）
/// - 每块写出前先检查信号，已取消则立即返回；
/// - 写出过程中以 `select!` 同时等待取消，客户端断开时不必等到底层写完成；
/// - 全部写完后 `flush` 一次。
///
/// # 契约说明（What）
/// - 成功返回写出的字节数（等于 `payload.len()`）；
/// - 取消返回 [`FormatterError::Cancelled`]，携带已确认写出的字节数；
/// - IO 错误原样包装为 [`FormatterError::Io`]。
pub async fn write_cancellable(
    body: &mut (dyn AsyncWrite + Unpin + Send),
    payload: &[u8],
    request_aborted: &RequestAborted,
) -> Result<usize, FormatterError> {
    let mut written = 0;
    for chunk in payload.chunks(WRITE_CHUNK_SIZE) {
        if request_aborted.is_cancelled() {
            return Err(FormatterError::Cancelled { written });
        }
        tokio::select! {
            biased;
            _ = request_aborted.cancelled() => {
                return Err(FormatterError::Cancelled { written });
            }
            result = body.write_all(chunk) => result?,
        }
        written += chunk.len();
    }
    body.flush().await?;
    Ok(written)
}
