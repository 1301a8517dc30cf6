//! In-process simulation: N nodes on a memory mesh vote on one claim.
//!
//! The author posts, honest nodes back the claim, dishonest nodes oppose
//! it, and every node runs its own seal pass. The shared clock only moves
//! when `--timeout` asks for the sealing window to elapse.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Args;
use rumorality_claims::FeedFilter;
use rumorality_network::{InMemoryRendezvous, MemoryMesh};
use rumorality_node::{Collaborators, NodeConfig, NodeSnapshot, RumorNode};
use rumorality_nullables::{NullAttestation, NullClock};
use rumorality_store::MemoryStore;
use rumorality_types::{ClaimId, Outcome};
use serde::Serialize;

/// Polls before giving up on replication settling.
const SETTLE_ATTEMPTS: usize = 500;
const SETTLE_POLL: Duration = Duration::from_millis(10);

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Total number of nodes, the author included.
    #[arg(long, default_value_t = 5)]
    pub nodes: usize,

    /// How many of the voters vote false.
    #[arg(long, default_value_t = 1)]
    pub dishonest: usize,

    /// Votes requested by each voter (priced quadratically by default).
    #[arg(long, default_value_t = 2)]
    pub votes: u64,

    /// The author's post stake.
    #[arg(long, default_value_t = 10)]
    pub stake: u64,

    #[arg(long, default_value = "the old bridge is closing for repairs")]
    pub content: String,

    /// Advance the clock past the sealing window before the seal pass.
    #[arg(long)]
    pub timeout: bool,
}

#[derive(Debug, Serialize)]
pub struct NodeReport {
    #[serde(flatten)]
    pub snapshot: NodeSnapshot,
    pub role: &'static str,
    pub outcome: Option<Outcome>,
    pub trust_score: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct SimulationReport {
    pub claim: ClaimId,
    pub true_weight: f64,
    pub false_weight: f64,
    pub frames_delivered: u64,
    pub nodes: Vec<NodeReport>,
}

pub async fn run(config: NodeConfig, args: SimulateArgs) -> anyhow::Result<SimulationReport> {
    if args.nodes < 2 {
        bail!("a simulation needs at least two nodes");
    }
    if args.dishonest >= args.nodes {
        bail!("dishonest voters must be fewer than the node count");
    }
    let config = NodeConfig {
        seal_scan_interval_ms: 0,
        peer_probe_interval_ms: 0,
        ..config
    };

    let clock = Arc::new(NullClock::default());
    let mesh = MemoryMesh::new();
    let rendezvous = Arc::new(InMemoryRendezvous::new(clock.clone()));

    let mut nodes = Vec::with_capacity(args.nodes);
    for i in 0..args.nodes {
        let node = RumorNode::new(
            config.clone(),
            Collaborators {
                store: Arc::new(MemoryStore::new()),
                clock: clock.clone(),
                attestation: Arc::new(NullAttestation::new(format!("sim-device-{i}"))),
                transport: Arc::new(mesh.endpoint()),
                rendezvous: Some(rendezvous.clone()),
            },
        )?;
        node.start().await?;
        nodes.push(node);
    }

    let peers = args.nodes - 1;
    for node in &nodes {
        node.probe_peers().await;
        settle(move || async move { node.open_peers().await.len() == peers })
            .await
            .context("mesh did not fully connect")?;
    }
    tracing::info!(nodes = args.nodes, "simulation mesh connected");

    let author = &nodes[0];
    let claim = author
        .post_claim(&args.content, args.stake, None)
        .await
        .context("author could not post")?;

    let honest = args.nodes - 1 - args.dishonest;
    for (i, voter) in nodes.iter().enumerate().skip(1) {
        settle(move || async move { voter.get_claim(&claim.id).await.is_some() })
            .await
            .context("claim did not replicate")?;
        let direction = if i <= honest { "true" } else { "false" };
        voter
            .cast_vote(&claim.id, direction, args.votes)
            .await
            .with_context(|| format!("node {i} could not vote"))?;
    }

    let expected_votes = args.nodes;
    for node in &nodes {
        settle(move || async move { node.votes_for_claim(&claim.id).await.len() == expected_votes })
            .await
            .context("votes did not replicate")?;
    }

    if args.timeout {
        clock.advance(config.params.sealing_window_ms + 1);
    }
    for node in &nodes {
        node.seal_pass().await;
    }

    let tally = author
        .get_claim(&claim.id)
        .await
        .map(|c| c.tally)
        .unwrap_or_default();
    let mut reports = Vec::with_capacity(nodes.len());
    for (i, node) in nodes.iter().enumerate() {
        let role = match i {
            0 => "author",
            i if i <= honest => "honest",
            _ => "dishonest",
        };
        let outcome = node
            .feed(FeedFilter::Sealed)
            .await
            .into_iter()
            .find(|c| c.id == claim.id)
            .and_then(|c| c.outcome);
        reports.push(NodeReport {
            snapshot: node.snapshot().await,
            role,
            outcome,
            trust_score: node.trust_score(&claim.id).await,
        });
    }

    for node in &nodes {
        node.shutdown().await?;
    }

    Ok(SimulationReport {
        claim: claim.id,
        true_weight: tally.true_side.weight,
        false_weight: tally.false_side.weight,
        frames_delivered: mesh.frames_delivered()?,
        nodes: reports,
    })
}

async fn settle<F, Fut>(mut check: F) -> anyhow::Result<()>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..SETTLE_ATTEMPTS {
        if check().await {
            return Ok(());
        }
        tokio::time::sleep(SETTLE_POLL).await;
    }
    bail!("timed out after {} polls", SETTLE_ATTEMPTS)
}
