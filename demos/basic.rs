//! Carves three small allocations out of the default arena, releases two of
//! them and allocates again to show the freed neighbours being fused.

use chunkheap::{HeapConfig, HeapManager, HeapReport, HeapResult};

fn log_alloc(size: usize, handle: Option<chunkheap::Handle>) {
    println!("Requested {size} bytes of memory");
    match handle {
        Some(handle) => println!("Received this offset: {handle}"),
        None => println!("Received nothing"),
    }
}

fn main() -> HeapResult<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => HeapConfig::load(path)?,
        None => HeapConfig::default(),
    };

    let mut heap = HeapManager::new(config)?;

    let root = heap.allocate(4)?;
    log_alloc(4, root);
    let root2 = heap.allocate(4)?;
    log_alloc(4, root2);
    let root3 = heap.allocate(4)?;
    log_alloc(4, root3);

    heap.release(root)?;
    heap.release(root2)?;

    let merged = heap.allocate(6)?;
    log_alloc(6, merged);

    heap.collect();

    print!("{}", HeapReport(&heap));

    Ok(())
}
