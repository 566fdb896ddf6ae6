//! End-to-end tests driving the platform context with a register-file fake
//! in place of the command processor and a thread playing the completion
//! interrupt.

use gpu2d_pal::context::{Gpu2dContext, PalConfig};
use gpu2d_pal::device::{Gpu2dDevice, regs};
use gpu2d_pal::error::PalError;
use gpu2d_pal::sync::{Resource, WaitStrategy};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Default)]
struct FakeDevice {
    regs: Mutex<HashMap<u32, u32>>,
    flushes: AtomicU32,
}

impl Gpu2dDevice for FakeDevice {
    fn read_reg(&self, reg: u32) -> u32 {
        *self.regs.lock().unwrap().get(&reg).unwrap_or(&0)
    }

    fn write_reg(&self, reg: u32, value: u32) {
        self.regs.lock().unwrap().insert(reg, value);
    }

    fn flush_dcache(&self, _base: *const u8, _size: usize) {
        self.flushes.fetch_add(1, Ordering::SeqCst);
    }
}

fn init(config: PalConfig) -> (Arc<FakeDevice>, Arc<Gpu2dContext>) {
    let device = Arc::new(FakeDevice::default());
    let ctx = Arc::new(Gpu2dContext::init(device.clone(), config).unwrap());
    (device, ctx)
}

#[test]
fn buffer_lifecycle_does_not_leak() {
    let (_device, ctx) = init(PalConfig::new().ring_size(1024));

    let bo = ctx.create_buffer(4096).unwrap();
    assert_eq!(bo.size(), 4096);
    assert!(!bo.map().is_null());
    ctx.destroy_buffer(bo);

    // A second identical allocation must succeed.
    let bo = ctx.create_buffer(4096).unwrap();
    assert_eq!(bo.size(), 4096);
    ctx.destroy_buffer(bo);
}

#[test]
fn pool_capacity_is_conserved() {
    let (_device, ctx) = init(PalConfig::new().pool(0x200D_0000, 64 * 1024));
    let before = ctx.pool_available(0).unwrap();

    let a = ctx.create_buffer_from_pool(0, 4096).unwrap();
    let b = ctx.create_buffer_from_pool(0, 1024).unwrap();
    assert!(ctx.pool_available(0).unwrap() < before);

    ctx.destroy_buffer(a);
    ctx.destroy_buffer(b);
    assert_eq!(ctx.pool_available(0).unwrap(), before);
}

#[test]
fn pool_exhaustion_is_an_error_not_a_corruption() {
    let (_device, ctx) = init(PalConfig::new().pool(0x2000_0000, 1024));

    match ctx.create_buffer_from_pool(0, 4096) {
        Err(PalError::AllocationExhausted { requested, .. }) => assert_eq!(requested, 4096),
        other => panic!("expected AllocationExhausted, got {other:?}"),
    }

    // The pool must still be fully usable afterwards.
    let bo = ctx.create_buffer_from_pool(0, 1024).unwrap();
    ctx.destroy_buffer(bo);
}

#[test]
fn wait_returns_immediately_when_target_already_retired() {
    let (_device, ctx) = init(PalConfig::new());

    ctx.completion_isr(5);
    ctx.wait_for_cl(5).unwrap();
    ctx.wait_for_cl(3).unwrap();
    assert_eq!(ctx.last_completed_cl(), 5);
}

#[test]
fn wait_never_returns_before_completion() {
    for strategy in [
        WaitStrategy::Busy,
        WaitStrategy::Semaphore,
        WaitStrategy::KernelSemaphore,
    ] {
        let (_device, ctx) = init(PalConfig::new().wait_strategy(strategy));

        let isr_ctx = Arc::clone(&ctx);
        let isr = thread::spawn(move || {
            for id in 1..=8u32 {
                thread::sleep(Duration::from_millis(2));
                isr_ctx.completion_isr(id);
            }
        });

        ctx.wait_for_cl(8).unwrap();
        assert!(ctx.last_completed_cl() >= 8, "strategy {strategy:?}");
        isr.join().unwrap();
    }
}

#[test]
fn task_notify_strategy_wakes_the_registered_thread() {
    // TaskNotify targets the thread that ran init, so both init and the
    // wait happen on this thread while a helper plays the interrupt.
    let (_device, ctx) = init(PalConfig::new().wait_strategy(WaitStrategy::TaskNotify));

    let isr_ctx = Arc::clone(&ctx);
    let isr = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        isr_ctx.completion_isr(1);
    });

    ctx.wait_for_cl(1).unwrap();
    isr.join().unwrap();
}

#[test]
fn completion_counter_is_monotonic() {
    let (_device, ctx) = init(PalConfig::new());

    ctx.completion_isr(2);
    ctx.completion_isr(9);
    ctx.completion_isr(4);
    assert_eq!(ctx.last_completed_cl(), 9);
}

#[test]
fn named_locks_exclude_concurrent_contexts() {
    let (_device, ctx) = init(PalConfig::new());
    let inside = Arc::new(AtomicU32::new(0));
    let peak = Arc::new(AtomicU32::new(0));

    let mut handles = Vec::new();
    for _ in 0..4 {
        let ctx = Arc::clone(&ctx);
        let inside = Arc::clone(&inside);
        let peak = Arc::clone(&peak);
        handles.push(thread::spawn(move || {
            for _ in 0..100 {
                let _guard = ctx.lock(Resource::Allocator).unwrap();
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                inside.fetch_sub(1, Ordering::SeqCst);
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(peak.load(Ordering::SeqCst), 1);
}

#[test]
fn allocator_stays_consistent_under_contention() {
    let (_device, ctx) = init(PalConfig::new().pool(0x200D_0000, 256 * 1024));
    let before = ctx.pool_available(0).unwrap();

    let mut handles = Vec::new();
    for _ in 0..4 {
        let ctx = Arc::clone(&ctx);
        handles.push(thread::spawn(move || {
            for _ in 0..50 {
                let bo = ctx.create_buffer_from_pool(0, 512).unwrap();
                ctx.destroy_buffer(bo);
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(ctx.pool_available(0).unwrap(), before);
}

#[test]
fn breakpoint_wait_observes_the_register() {
    let (device, ctx) = init(PalConfig::new().wait_strategy(WaitStrategy::Semaphore));

    let isr_ctx = Arc::clone(&ctx);
    let isr_device = Arc::clone(&device);
    let isr = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        isr_device.write_reg(regs::BREAKPOINT, 1);
        isr_ctx.completion_isr(1);
    });

    ctx.wait_for_breakpoint().unwrap();
    assert_eq!(ctx.reg_read(regs::BREAKPOINT), 1);
    isr.join().unwrap();
}

#[test]
fn flushes_are_counted_only_when_memory_is_cacheable() {
    let (device, ctx) = init(PalConfig::new().cached_memory());
    let bo = ctx.create_buffer(128).unwrap();

    ctx.flush_buffer(&bo).unwrap();
    ctx.flush_buffer(&bo).unwrap();
    assert_eq!(device.flushes.load(Ordering::SeqCst), 2);

    ctx.destroy_buffer(bo);
}
