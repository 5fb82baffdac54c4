use async_trait::async_trait;
use criterion::{Criterion, criterion_group, criterion_main};
use event_bus::{
    BusBuilder, Event, EventBus, EventHandler, Handler, HandlerContracts, HandlerDescriptor,
    HandlerResult, Saga, SagaContracts, SagaCore, SagaDescriptor, SagaHandles, SagaStartedBy,
};

struct Frame(u64);
impl Event for Frame {}

struct RoundStarted;
impl Event for RoundStarted {}

struct Answer;
impl Event for Answer {}

#[derive(Default)]
struct FrameCounter;

#[async_trait]
impl EventHandler<Frame> for FrameCounter {
    async fn handle(&self, event: &Frame) -> HandlerResult {
        std::hint::black_box(event.0);
        Ok(())
    }
}

impl Handler for FrameCounter {
    fn declare(contracts: &mut HandlerContracts<Self>) {
        contracts.handles::<Frame>();
    }
}

#[derive(Default)]
struct Round {
    core: SagaCore<u64>,
}

impl Saga for Round {
    fn is_active(&self) -> bool {
        self.core.is_active()
    }

    fn reset(&mut self) {
        self.core.reset();
    }

    fn declare(contracts: &mut SagaContracts<Self>) {
        contracts.started_by::<RoundStarted>().handles::<Answer>();
    }
}

#[async_trait]
impl SagaStartedBy<RoundStarted> for Round {
    async fn handle_start(&mut self, _event: &RoundStarted) -> HandlerResult {
        self.core.begin();
        Ok(())
    }
}

#[async_trait]
impl SagaHandles<Answer> for Round {
    async fn handle(&mut self, _event: &Answer) -> HandlerResult {
        *self.core.state_mut() += 1;
        Ok(())
    }
}

fn build_bus() -> EventBus {
    BusBuilder::new()
        .register_handlers([HandlerDescriptor::of::<FrameCounter>()])
        .register_sagas([SagaDescriptor::of::<Round>()])
        .build()
}

fn bench_publish_unrouted(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let bus = BusBuilder::new().build();

    c.bench_function("bus/publish_unrouted", |b| {
        b.iter(|| {
            rt.block_on(bus.publish(Answer));
        });
    });
}

fn bench_publish_to_handler(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let bus = build_bus();

    c.bench_function("bus/publish_to_handler", |b| {
        b.iter(|| {
            rt.block_on(bus.publish(Frame(7)));
        });
    });
}

fn bench_start_round(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let bus = build_bus();

    c.bench_function("bus/start_round", |b| {
        b.iter(|| {
            rt.block_on(bus.publish(RoundStarted));
        });
    });
}

fn bench_route_to_active_saga(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let bus = build_bus();
    rt.block_on(bus.publish(RoundStarted));

    c.bench_function("bus/route_to_active_saga", |b| {
        b.iter(|| {
            rt.block_on(bus.publish(Answer));
        });
    });
}

fn bench_round_of_100_answers(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let bus = build_bus();

    c.bench_function("bus/round_of_100_answers", |b| {
        b.iter(|| {
            rt.block_on(async {
                bus.publish(RoundStarted).await;
                for _ in 0..100 {
                    bus.publish(Answer).await;
                }
            });
        });
    });
}

criterion_group!(
    benches,
    bench_publish_unrouted,
    bench_publish_to_handler,
    bench_start_round,
    bench_route_to_active_saga,
    bench_round_of_100_answers,
);
criterion_main!(benches);
