//! Three participants on one in-memory mesh complete a few rounds.
//!
//! Rounds are driven in lockstep here; in a real deployment the local
//! training time between rounds plays that role.
//!
//! Run with: cargo run --example local_mesh

use std::sync::Arc;

use fedmesh::prelude::*;
use fedmesh::ParticipantBuilder;

struct StdoutObserver(&'static str);

impl ProgressObserver for StdoutObserver {
    fn message(&self, text: &str) {
        println!("[{}] {text}", self.0);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    const ROUNDS: usize = 3;
    const DIM: usize = 8;

    let mesh = InMemoryMesh::new();
    let names = ["alice", "bob", "carol"];

    let mut participants = Vec::new();
    for (index, name) in names.into_iter().enumerate() {
        let (member, events) = mesh.join();
        let config = TaskConfig {
            quorum: names.len() - 1,
            noise_scale: Some(0.01),
            clipping_radius: Some(1.0),
            ..TaskConfig::named("local-demo")
        };
        let coordinator = ParticipantBuilder::new()
            .config(config)
            .observer(StdoutObserver(name))
            .connect(Arc::new(member), events)?;

        // Each participant starts from a different point; rounds of
        // simulated training plus averaging pull them together.
        let weights = WeightSnapshot::new(vec![index as f32; DIM]);
        participants.push((name, coordinator, weights));
    }

    for _ in 0..ROUNDS {
        let mut handles = Vec::new();
        for (name, mut coordinator, weights) in participants.drain(..) {
            handles.push(tokio::spawn(async move {
                let stale = weights;
                let updated =
                    WeightSnapshot::new(stale.as_slice().iter().map(|w| w * 0.9).collect());
                let next = coordinator.exchange_round(&updated, &stale).await?;
                Ok::<_, RoundError>((name, coordinator, next))
            }));
        }
        for handle in handles {
            participants.push(handle.await??);
        }
    }

    for (name, coordinator, weights) in &participants {
        coordinator.finish_training();
        println!(
            "{name} finished {} rounds with weights[0] = {:.4}",
            coordinator.round(),
            weights.as_slice()[0]
        );
    }

    Ok(())
}
