use std::sync::Arc;

use application::{ConnectionHandle, MessageRouter, OutboundReceiver};
use axum::extract::ws::{Message as WsMessage, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::{sync::mpsc, task::JoinHandle};

/// WebSocket 连接驱动
///
/// 每个连接一对任务：
/// - 发送任务：把核心投递到出站队列的信封以及 pong 写入套接字
/// - 接收任务：按到达顺序把文本帧交给 [`MessageRouter`]，处理完一条再读下一条
///
/// 任一任务结束即视为连接关闭，随后只调用一次 [`MessageRouter::disconnect`]。
pub struct WebSocketConnection {
    socket: WebSocket,
    router: Arc<MessageRouter>,
    handle: ConnectionHandle,
    outbound: OutboundReceiver,
}

impl WebSocketConnection {
    pub fn new(socket: WebSocket, router: Arc<MessageRouter>) -> Self {
        let (handle, outbound) = ConnectionHandle::open();
        tracing::info!(connection_id = %handle.id(), "WebSocket 连接已建立");

        Self {
            socket,
            router,
            handle,
            outbound,
        }
    }

    pub async fn run(self) {
        let Self {
            socket,
            router,
            handle,
            mut outbound,
        } = self;
        let connection_id = handle.id();
        let (mut sender, mut incoming) = socket.split();

        // 创建 mpsc channel 来解耦对 sender 的访问
        let (cmd_tx, mut cmd_rx) = mpsc::channel::<WsCommand>(32);

        // 发送任务：统一处理所有对 WebSocket sender 的写操作
        let send_task = tokio::spawn(async move {
            loop {
                let payload = tokio::select! {
                    Some(cmd) = cmd_rx.recv() => match cmd {
                        WsCommand::SendPong(data) => WsMessage::Pong(data.into()),
                    },
                    Some(envelope) = outbound.recv() => match envelope.to_json() {
                        Ok(json) => WsMessage::Text(json.into()),
                        Err(err) => {
                            tracing::warn!(error = %err, "failed to serialize websocket payload");
                            continue;
                        }
                    },
                    else => break,
                };

                if sender.send(payload).await.is_err() {
                    tracing::debug!("socket write failed");
                    break;
                }
            }
            tracing::debug!("WebSocket发送任务结束");
        });

        // 接收任务：处理来自WebSocket客户端的消息
        let recv_task = {
            let router = router.clone();
            let handle = handle.clone();
            tokio::spawn(async move {
                while let Some(Ok(message)) = incoming.next().await {
                    if Self::handle_incoming(message, &router, &handle, &cmd_tx)
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
                tracing::debug!("WebSocket接收任务结束");
            })
        };

        // 等待任意一个任务完成（连接断开），另一个任务彻底退出后才注销
        join_first_then_abort(send_task, recv_task).await;

        router.disconnect(&handle).await;
        tracing::info!(connection_id = %connection_id, "WebSocket连接已断开");
    }

    async fn handle_incoming(
        message: WsMessage,
        router: &MessageRouter,
        handle: &ConnectionHandle,
        cmd_tx: &mpsc::Sender<WsCommand>,
    ) -> Result<(), ()> {
        match message {
            WsMessage::Text(text) => router.handle(handle, text.as_str()).await,
            WsMessage::Close(_) => {
                tracing::debug!("WebSocket收到关闭消息");
                return Err(());
            }
            WsMessage::Ping(data) => {
                if cmd_tx
                    .send(WsCommand::SendPong(data.to_vec()))
                    .await
                    .is_err()
                {
                    tracing::warn!("Failed to send pong command");
                    return Err(());
                }
            }
            WsMessage::Pong(_) => {}
            WsMessage::Binary(_) => {
                tracing::debug!(connection_id = %handle.id(), "ignoring binary frame");
            }
        }
        Ok(())
    }
}

/// 等待任一任务结束，中止另一个并等它真正退出
///
/// 返回时两个任务都已停止，不会再有帧交给路由。
async fn join_first_then_abort(mut first: JoinHandle<()>, mut second: JoinHandle<()>) {
    let remaining = tokio::select! {
        _ = &mut first => second,
        _ = &mut second => first,
    };
    remaining.abort();
    if let Err(err) = remaining.await {
        if !err.is_cancelled() {
            tracing::warn!(error = %err, "WebSocket任务异常退出");
        }
    }
}

/// WebSocket 写操作命令
#[derive(Debug)]
enum WsCommand {
    SendPong(Vec<u8>),
}
