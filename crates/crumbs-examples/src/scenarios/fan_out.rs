use std::time::Duration;

use crumbs::{FutureExt as _, JoinSet};
use tracing::info;

pub async fn run(workers: usize) -> Result<(), String> {
    let _job = crumbs::push("Job=reindex");
    info!(workers, "fanning out");

    let mut set = JoinSet::new();
    for shard in 0..workers {
        set.spawn(async move {
            let _shard = crumbs::push(format!("Shard={shard}"));
            tokio::time::sleep(Duration::from_millis(5 * (workers - shard) as u64)).await;
            info!("shard indexed");
            shard
        });
    }

    let mut done = 0;
    while let Some(joined) = set.join_next().await {
        let shard = joined.map_err(|e| format!("shard task failed: {e}"))?;
        info!(shard, "joined");
        done += 1;
    }

    let (left, right) = tokio::join!(
        async {
            info!("checking primary");
            "primary"
        }
        .with_frame("Replica=primary"),
        async {
            info!("checking secondary");
            "secondary"
        }
        .with_frame("Replica=secondary"),
    );
    info!(done, left, right, "fan-out finished");
    Ok(())
}
