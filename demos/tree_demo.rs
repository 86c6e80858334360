//! Demonstrates a parent/child counter tree: per-job counters that roll up
//! into a per-worker-pool total, best-effort and non-transactional.

use shard_tally::{counter_schema, TypedCollection};
use std::thread;

counter_schema! {
    pub enum JobCounters {
        Completed => Numeric,
        Failed => Numeric,
        Execution => Stopwatch,
    }
}

fn main() {
    let pool_totals = TypedCollection::<JobCounters>::new(None).unwrap();

    let handles: Vec<_> = (0..4)
        .map(|worker_id| {
            // Each worker's job counters roll up into `pool_totals`.
            let job_counters = TypedCollection::<JobCounters>::new(Some(&pool_totals)).unwrap();
            thread::spawn(move || {
                for job in 0..25 {
                    let _scope = job_counters.start(JobCounters::Execution).unwrap();
                    if (worker_id + job) % 7 == 0 {
                        job_counters.increment(JobCounters::Failed).unwrap();
                    } else {
                        job_counters.increment(JobCounters::Completed).unwrap();
                    }
                }
                job_counters
            })
        })
        .collect();

    let mut per_worker = Vec::new();
    for h in handles {
        per_worker.push(h.join().unwrap());
    }

    println!("pool totals:\n{pool_totals}");
    for (id, counters) in per_worker.iter().enumerate() {
        println!(
            "worker {id}: completed={} failed={} jobs={}",
            counters.value(JobCounters::Completed),
            counters.value(JobCounters::Failed),
            counters.value(JobCounters::Execution),
        );
    }

    for stats in [pool_totals.statistics("pool.")] {
        for (key, value) in &stats {
            println!("{key} = {value}");
        }
    }
}
