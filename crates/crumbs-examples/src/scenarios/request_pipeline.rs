use std::time::Duration;

use tracing::{info, warn};

pub async fn run() -> Result<(), String> {
    for request_id in [41, 42] {
        let _request = crumbs::push(format!("RequestId={request_id}"));
        info!("accepted");
        match handle(request_id).await {
            Ok(bytes) => info!(bytes, "completed"),
            Err(err) => warn!(%err, "failed"),
        }
    }
    info!("pipeline drained");
    Ok(())
}

async fn handle(request_id: u32) -> Result<usize, String> {
    let body = {
        let _step = crumbs::push("read_body");
        tokio::time::sleep(Duration::from_millis(10)).await;
        info!("body read");
        vec![0u8; request_id as usize]
    };

    let _step = crumbs::push("validate");
    tokio::task::yield_now().await;
    if body.len() % 2 == 1 {
        // `validate` is popped on this return as well.
        return Err(format!("odd payload length {}", body.len()));
    }
    info!("payload accepted");
    Ok(body.len())
}
