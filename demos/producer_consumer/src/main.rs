//! producer_consumer — smallest end-to-end example for the rust_vt kernel.
//!
//! One producer virtual thread pushes parts onto a single-slot belt with
//! blocking posts; a consumer driven by a `LocalEventSchedule` picks them up
//! at randomised instants.  An inspector entity parks on the first part with
//! `block_while_present` and reports when that exact part has been consumed.

use std::sync::{Arc, Mutex};

use vt_core::{EventKind, Executive, Priority, SimRng, TestExecutive, VirtualTime};
use vt_exchange::{ExchangeObserver, SynchronizedExchange, Tuple};
use vt_sched::LocalEventSchedule;

// ── Constants ─────────────────────────────────────────────────────────────────

const PART_COUNT:    u32 = 8;
const SEED:          u64 = 42;
const BELT:          &str = "belt";
const FIRST_PICKUP:  u64 = 10;
const MAX_GAP:       u64 = 9; // consumer pickup gap drawn from 1..=MAX_GAP

// ── Traffic accounting ────────────────────────────────────────────────────────

#[derive(Default)]
struct TrafficCounter {
    posted: usize,
    taken:  usize,
}

type SharedCounter = Arc<Mutex<TrafficCounter>>;

struct CountingObserver(SharedCounter);

impl ExchangeObserver<&'static str, u32> for CountingObserver {
    fn on_posted(&mut self, tuple: &Arc<Tuple<&'static str, u32>>) {
        println!("           posted part {}", tuple.data);
        self.0.lock().unwrap().posted += 1;
    }

    fn on_taken(&mut self, _tuple: &Arc<Tuple<&'static str, u32>>) {
        self.0.lock().unwrap().taken += 1;
    }
}

// ── main ──────────────────────────────────────────────────────────────────────

fn main() {
    println!("=== producer_consumer — rust_vt kernel ===");
    println!("Parts: {PART_COUNT}  |  Seed: {SEED}");
    println!();

    let exec = TestExecutive::new();
    let exec_arc: Arc<dyn Executive> = Arc::new(exec.clone());
    let belt: Arc<SynchronizedExchange<&'static str, u32>> =
        Arc::new(SynchronizedExchange::new(Arc::clone(&exec_arc)));

    let counter: SharedCounter = Arc::new(Mutex::new(TrafficCounter::default()));
    belt.subscribe(Box::new(CountingObserver(Arc::clone(&counter))));

    // 1. Producer: one virtual thread, parked on the belt slot until the
    //    consumer frees it.
    {
        let belt = Arc::clone(&belt);
        exec.request_event(
            VirtualTime(1),
            Priority::ZERO,
            EventKind::Detachable,
            Box::new(move |e| {
                for part in 0..PART_COUNT {
                    println!("{:>6}  producer: pushing part {part}", e.now().to_string());
                    belt.post(BELT, part, true).expect("belt slot is free after a take");
                    println!("{:>6}  producer: part {part} picked up", e.now().to_string());
                }
            }),
        );
    }

    // 2. Inspector: watches the first part specifically.
    {
        let belt = Arc::clone(&belt);
        exec.request_event(
            VirtualTime(2),
            Priority::ZERO,
            EventKind::Detachable,
            Box::new(move |e| {
                belt.block_while_present(&BELT).expect("inspector runs detachable");
                println!("{:>6}  inspector: first part has left the belt", e.now().to_string());
            }),
        );
    }

    // 3. Consumer: pickup instants pre-planned on a local schedule so the
    //    executive only ever sees the next one.
    let mut rng = SimRng::new(SEED);
    let pickups = {
        let belt = Arc::clone(&belt);
        LocalEventSchedule::new(Arc::clone(&exec_arc), 4, move |pickup: u32, when| {
            let tuple = belt
                .take(&BELT, false)
                .expect("non-blocking take cannot fail")
                .expect("producer keeps the belt stocked");
            println!("{:>6}  consumer: pickup {pickup} got part {}", when.to_string(), tuple.data);
        })
    };
    let mut at = FIRST_PICKUP;
    for pickup in 0..PART_COUNT {
        pickups.enqueue(pickup, VirtualTime(at));
        at += rng.gen_range(1..=MAX_GAP);
    }
    println!(
        "Planned {} pickups between T{FIRST_PICKUP} and {}",
        pickups.len(),
        pickups.latest_time(),
    );
    println!();

    // 4. Run to quiescence.
    exec.run();

    // 5. Summary.
    let counter = counter.lock().unwrap();
    println!();
    println!("Virtual clock stopped at {}", exec.now());
    println!("  parts posted : {}", counter.posted);
    println!("  parts taken  : {}", counter.taken);
    assert_eq!(counter.posted, counter.taken);
}
