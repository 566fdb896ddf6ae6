//! Drives the platform layer against a simulated command processor: the
//! main thread plays the application issuing command lists, a worker thread
//! plays the GPU retiring them and raising the completion interrupt.

use gpu2d_pal::context::{Gpu2dContext, PalConfig};
use gpu2d_pal::device::{Gpu2dDevice, regs};
use gpu2d_pal::sync::{Resource, WaitStrategy};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Register file plus a mailbox the "GPU" thread watches for submissions.
#[derive(Default)]
struct SimDevice {
    regs: Mutex<HashMap<u32, u32>>,
    submitted: AtomicU32,
    shutdown: AtomicBool,
}

impl Gpu2dDevice for SimDevice {
    fn read_reg(&self, reg: u32) -> u32 {
        *self.regs.lock().unwrap().get(&reg).unwrap_or(&0)
    }

    fn write_reg(&self, reg: u32, value: u32) {
        self.regs.lock().unwrap().insert(reg, value);
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Submit / Wait Round Trip ===");

    let device = Arc::new(SimDevice::default());

    let config = PalConfig::new()
        .ring_size(1024)
        .wait_strategy(WaitStrategy::Semaphore)
        .pool(0x200D_0000, 1664 * 1024);

    let ctx = Arc::new(Gpu2dContext::init(device.clone(), config)?);
    println!("[+] Context up");
    println!(
        "    ring: {} bytes at bus address 0x{:x}",
        ctx.ring().capacity(),
        ctx.ring().base_phys()
    );

    // GPU side: retire each submitted command list and fire the interrupt.
    let gpu_device = Arc::clone(&device);
    let gpu_ctx = Arc::clone(&ctx);
    let gpu = thread::spawn(move || {
        let mut retired = 0u32;
        while !gpu_device.shutdown.load(Ordering::Acquire) {
            let submitted = gpu_device.submitted.load(Ordering::Acquire);
            if retired < submitted {
                retired += 1;
                thread::sleep(Duration::from_millis(3)); // pretend to draw
                gpu_device.write_reg(regs::CLID, retired);
                gpu_ctx.completion_isr(retired);
            } else {
                thread::sleep(Duration::from_millis(1));
            }
        }
    });

    // Application side: build a command list in a pool buffer, append it to
    // the ring under the ring lock, submit, then block on its completion.
    for cl_id in 1..=5u32 {
        let cl_buffer = ctx.create_buffer_from_pool(0, 256)?;

        {
            let _ring_section = ctx.lock(Resource::RingBuffer)?;
            let ring_base = ctx.ring().base_virt();
            unsafe {
                // A real driver encodes a jump-to-command-list here.
                ring_base.cast::<u32>().write(cl_id);
            }
        }
        ctx.flush_buffer(&cl_buffer)?;
        device.submitted.store(cl_id, Ordering::Release);

        ctx.wait_for_cl(cl_id)?;
        println!(
            "[+] Command list {cl_id} retired (hardware CLID register = {})",
            ctx.reg_read(regs::CLID)
        );

        ctx.destroy_buffer(cl_buffer);
    }

    device.shutdown.store(true, Ordering::Release);
    gpu.join().expect("GPU thread panicked");

    println!("[+] Pool bytes free: {}", ctx.pool_available(0)?);
    println!("=== Done ===");
    Ok(())
}
