use state_machines::state_machine;

state_machine! {
    name: EnrichmentMachine,
    state: EnrichmentState,
    initial: Ready,
    states: [Ready, IndexReady, Ingested, SentimentApplied, KeywordsApplied, Retained, Audited],
    events {
        prepare_index { transition: { from: Ready, to: IndexReady } }
        ingest { transition: { from: IndexReady, to: Ingested } }
        apply_sentiment { transition: { from: Ingested, to: SentimentApplied } }
        tag_keywords { transition: { from: SentimentApplied, to: KeywordsApplied } }
        enforce_retention { transition: { from: KeywordsApplied, to: Retained } }
        audit { transition: { from: Retained, to: Audited } }
    }
}

pub fn ready() -> EnrichmentMachine<(), Ready> {
    EnrichmentMachine::new(())
}
