use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use fabula_governance::{
    max_weight_from_budget, GovernanceConfig, ManualClock, MemoryLedger, MemoryProposalStore,
    Proposal, RoundSpec, VoteDirection, VotingEngine, VotingPower,
};
use fabula_types::{AccountId, ProposalId, RoundId, StoryId, Timestamp};

fn bench_power(c: &mut Criterion) {
    c.bench_function("max_weight_u64_budget", |bencher| {
        bencher.iter(|| max_weight_from_budget(u64::MAX as u128))
    });
    c.bench_function("max_weight_u128_budget", |bencher| {
        bencher.iter(|| max_weight_from_budget(u128::MAX))
    });
    c.bench_function("voting_power_compute", |bencher| {
        bencher.iter(|| VotingPower::compute(1_000_000_000, 250_000))
    });
}

type BenchEngine = VotingEngine<Arc<MemoryLedger>, Arc<MemoryProposalStore>, Arc<ManualClock>>;

fn engine_with_voters(voters: &[AccountId]) -> BenchEngine {
    let ledger = Arc::new(MemoryLedger::with_balances(
        voters.iter().map(|v| (v.clone(), 1_000_000)),
    ));
    let store = Arc::new(MemoryProposalStore::new());
    let proposal = ProposalId::new("p-1");
    store.insert(
        Proposal::new(
            proposal.clone(),
            StoryId::new("bench"),
            1,
            AccountId::new("author"),
            "Bench".to_string(),
            String::new(),
            Timestamp::new(0),
        )
        .unwrap(),
    );

    let engine = VotingEngine::with_config(
        ledger,
        store,
        Arc::new(ManualClock::new(1)),
        GovernanceConfig::default(),
    )
    .unwrap();
    engine
        .open_round(RoundSpec {
            id: RoundId::new("r-1"),
            story_id: StoryId::new("bench"),
            chapter_number: 1,
            proposal_ids: vec![proposal],
            start_time: Timestamp::new(1),
            end_time: Timestamp::new(1_000_000),
            quorum_threshold: None,
        })
        .unwrap();
    engine
}

fn bench_submit(c: &mut Criterion) {
    let voters: Vec<AccountId> = (0..1_000).map(|i| AccountId::new(format!("voter-{}", i))).collect();
    let round = RoundId::new("r-1");
    let proposal = ProposalId::new("p-1");

    c.bench_function("submit_1000_votes", |bencher| {
        bencher.iter_batched(
            || engine_with_voters(&voters),
            |engine| {
                for voter in &voters {
                    let _ = engine.submit_vote(&round, &proposal, voter, VoteDirection::For, 10);
                }
                engine
            },
            BatchSize::LargeInput,
        )
    });

    let engine = engine_with_voters(&voters);
    for voter in &voters {
        let _ = engine.submit_vote(&round, &proposal, voter, VoteDirection::Against, 3);
    }
    c.bench_function("tally_1000_ballots", |bencher| bencher.iter(|| engine.tally(&round)));
}

criterion_group!(benches, bench_power, bench_submit);
criterion_main!(benches);
