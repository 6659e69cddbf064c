//! Handler for the `inspect` subcommand.

use anyhow::Result;

use taxicf::archive::load_filter;
use taxicf::layout::bin_ranges;

use super::args::InspectArgs;

pub fn run_inspect(args: InspectArgs) -> Result<()> {
    let archive = load_filter(&args.archive)?;

    println!("Filter archive: {}", args.archive.display());
    println!("  kmer size:   {}", archive.config.kmer_size);
    println!("  window size: {}", archive.config.window_size);
    println!("  bins:        {}", archive.config.bins);
    println!("  bin size:    {}", archive.config.bin_size);

    let capacity = archive.config.bins * archive.config.bin_size;
    let occupied = archive.icf.occupied_slots();
    if capacity > 0 {
        println!(
            "  occupancy:   {}/{} slots ({:.1}%)",
            occupied,
            capacity,
            occupied as f64 / capacity as f64 * 100.0
        );
    }

    println!("Taxids ({}):", archive.taxid_bins.len());
    let counts: std::collections::HashMap<&str, u64> = archive
        .hash_count
        .iter()
        .map(|(taxid, count)| (taxid.as_str(), *count))
        .collect();
    for (taxid, start, end) in bin_ranges(&archive.taxid_bins) {
        println!(
            "  {}\tfingerprints: {}\tbins: [{}, {})",
            taxid,
            counts.get(taxid).copied().unwrap_or(0),
            start,
            end
        );
    }

    Ok(())
}
