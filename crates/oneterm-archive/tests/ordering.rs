use std::sync::Arc;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use oneterm_archive::WorkerPool;

#[test]
fn test_single_worker_dequeues_in_submission_order() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let mut pool = WorkerPool::new("ordered", 1, move |label: &'static str| {
        sink.lock().unwrap().push(label);
    })
    .unwrap();

    pool.execute("J1").unwrap();
    pool.execute("J2").unwrap();
    pool.execute("J3").unwrap();
    pool.shutdown();

    assert_eq!(*seen.lock().unwrap(), vec!["J1", "J2", "J3"]);
}

#[test]
fn test_multi_worker_runs_every_job_once() {
    // Completion order is unspecified with several workers; only the set is checked.
    let dequeued = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&dequeued);
    let mut pool = WorkerPool::new("fifo", 4, move |n: u32| {
        sink.lock().unwrap().push(n);
        if n == 0 {
            thread::sleep(Duration::from_millis(50));
        }
    })
    .unwrap();

    for n in 0..20 {
        pool.execute(n).unwrap();
    }
    pool.shutdown();

    let mut order = dequeued.lock().unwrap().clone();
    assert_eq!(order.len(), 20);
    order.sort_unstable();
    assert_eq!(order, (0..20).collect::<Vec<_>>());
}
