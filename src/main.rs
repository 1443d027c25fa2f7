//! ntfsresc - forensic NTFS reader for partial disk images

use anyhow::{Context, Result};
use clap::Parser;
use ntfsresc::application::dto::VolumeInfo;
use ntfsresc::application::{
    BadClustersUseCase, ListDirectoryUseCase, RecoverClusterUseCase, RestoreUseCase, VolumeInfoUseCase,
};
use ntfsresc::domain::repositories::BlockDeviceReader;
use ntfsresc::infrastructure::block_device::{LinuxBlockDevice, MmapBlockDevice};
use ntfsresc::infrastructure::ntfs::{parse_boot_sector, SafeRegionIndex, VolumeContext, BOOT_SECTOR_SIZE};
use ntfsresc::infrastructure::{mapfile, overlay};
use ntfsresc::presentation::cli::{Cli, Commands, ProgressReporter};
use std::path::Path;
use std::sync::Arc;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    match cli.command {
        Commands::Info { image, offset } => run_info(&image, offset),

        Commands::List {
            image,
            offset,
            map,
            overlay: overlay_path,
            mft_index,
        } => run_list(&image, offset, map.as_deref(), overlay_path.as_deref(), mft_index),

        Commands::Restore {
            image,
            output,
            offset,
            map,
            overlay: overlay_path,
            mft_index,
        } => run_restore(&image, &output, offset, map.as_deref(), overlay_path.as_deref(), mft_index),

        Commands::BadClusters {
            image,
            offset,
            map,
            overlay: overlay_path,
            mft_index,
        } => run_bad_clusters(&image, offset, map.as_deref(), overlay_path.as_deref(), mft_index),

        Commands::Recover {
            image,
            device,
            offset,
            overlay: overlay_path,
            start_cluster,
            count,
        } => run_recover(&image, &device, offset, &overlay_path, start_cluster, count),
    }
}

fn open_volume(image_path: &str, offset: u64, map: Option<&Path>, overlay_path: Option<&Path>) -> Result<VolumeContext> {
    let image = MmapBlockDevice::open(image_path)
        .context("failed to open image. Make sure the path exists and is readable.")?;

    let safe_regions: Arc<dyn ntfsresc::domain::services::SafeRegionOracle> = match map {
        Some(path) => {
            let regions = mapfile::read_safe_regions(path).context("failed to read map file")?;
            Arc::new(SafeRegionIndex::new(regions))
        }
        None => Arc::new(SafeRegionIndex::whole_image(image.size())),
    };

    let volume = VolumeContext::open(Arc::new(image), offset, safe_regions)
        .context("failed to open NTFS volume")?;

    if let Some(base) = overlay_path {
        volume.with_overlay(base).context("failed to open overlay")?;
    }

    Ok(volume)
}

fn run_info(image_path: &str, offset: u64) -> Result<()> {
    let volume = open_volume(image_path, offset, None, None)?;
    let info = VolumeInfoUseCase::execute(&volume, image_path);
    print_volume_info(&info);
    Ok(())
}

fn print_volume_info(info: &VolumeInfo) {
    println!("Image:               {}", info.image_path);
    println!("Partition offset:    {:#x}", info.partition_offset);
    println!("Bytes per sector:    {}", info.bytes_per_sector);
    println!("Sectors per cluster: {}", info.sectors_per_cluster);
    println!("Cluster size:        {} bytes", info.cluster_size);
    println!("MFT record size:     {} bytes", info.mft_record_size);
    println!("MFT cluster:         {}", info.mft_cluster);
    println!("MFT mirror cluster:  {}", info.mft_mirror_cluster);
    println!("Volume size:         {} bytes", info.volume_size);
}

fn run_list(image_path: &str, offset: u64, map: Option<&Path>, overlay_path: Option<&Path>, mft_index: u64) -> Result<()> {
    let volume = open_volume(image_path, offset, map, overlay_path)?;
    let entries = ListDirectoryUseCase::execute(&volume, mft_index)
        .with_context(|| format!("failed to list directory {mft_index}"))?;

    for entry in entries {
        let kind = if entry.is_directory() { "d" } else { "-" };
        let deleted = if entry.deleted { " (deleted)" } else { "" };
        println!(
            "{kind} {:>10} {:>8} {}{deleted}",
            entry.mft_index, entry.size, entry.display_name
        );
    }

    Ok(())
}

fn run_restore(
    image_path: &str,
    output: &Path,
    offset: u64,
    map: Option<&Path>,
    overlay_path: Option<&Path>,
    mft_index: u64,
) -> Result<()> {
    let volume = open_volume(image_path, offset, map, overlay_path)?;

    let progress = ProgressReporter::for_restore();
    let mut callback = |files_written: u64| progress.update(files_written);
    let report = RestoreUseCase::execute(&volume, mft_index, output, Some(&mut callback))
        .with_context(|| format!("restore from MFT index {mft_index} failed"))?;
    progress.finish("restore complete");

    volume.save_overlay().context("failed to save overlay")?;

    println!("{}", report.summary());
    for range in &report.bad_clusters {
        println!("{range}");
    }

    Ok(())
}

fn run_bad_clusters(image_path: &str, offset: u64, map: Option<&Path>, overlay_path: Option<&Path>, mft_index: u64) -> Result<()> {
    let volume = open_volume(image_path, offset, map, overlay_path)?;
    let bad_clusters = BadClustersUseCase::execute(&volume, mft_index);

    for range in &bad_clusters {
        println!("{range}");
    }

    Ok(())
}

fn run_recover(
    image_path: &str,
    device_path: &str,
    offset: u64,
    overlay_path: &Path,
    start_cluster: u64,
    count: u64,
) -> Result<()> {
    let image =
        MmapBlockDevice::open(image_path).context("failed to open image to determine cluster size")?;
    let boot_sector = image.read_at(offset, BOOT_SECTOR_SIZE).context("failed to read boot sector")?;
    let geometry = parse_boot_sector(&boot_sector).context("failed to parse boot sector")?;

    let device = LinuxBlockDevice::open(device_path)
        .context("failed to open device. Make sure you have read permissions (try sudo).")?;

    let mut overlay_store = overlay::OverlayStoreFile::open(overlay_path, geometry.cluster_size())
        .context("failed to open overlay")?;

    let recovered = RecoverClusterUseCase::execute(
        &device,
        &mut overlay_store,
        offset,
        start_cluster,
        count,
        geometry.cluster_size(),
    )
    .context("cluster recovery failed")?;

    println!("recovered {recovered} cluster(s) into {}", overlay_path.display());
    Ok(())
}
