use tracing::info;

pub async fn run() -> Result<(), String> {
    let _upload = crumbs::push("Upload=avatar.png");
    info!("received upload");

    let checksum = crumbs::spawn_blocking(|| {
        let _step = crumbs::push("checksum");
        let sum = (0u64..100_000).fold(0u64, |acc, n| acc.wrapping_mul(31).wrapping_add(n));
        info!(sum, "checksum computed on the blocking pool");
        sum
    })
    .await
    .map_err(|e| format!("checksum task failed: {e}"))?;

    let snapshot = crumbs::ContextSnapshot::capture();
    std::thread::spawn(move || {
        let _entered = snapshot.enter();
        let _step = crumbs::push("audit");
        info!("audit written from a plain thread");
    })
    .join()
    .map_err(|_| "audit thread panicked".to_string())?;

    info!(checksum, depth = crumbs::depth(), "upload stored");
    Ok(())
}
