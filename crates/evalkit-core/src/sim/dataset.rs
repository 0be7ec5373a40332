//! Datasets served by the simulated backend.

use evalkit_log::BenchmarkUri;

use crate::env::Dataset;

/// Benchmark names of the finite `cbench-sim-v0` dataset.
pub const CBENCH_SIM_BENCHMARKS: [&str; 23] = [
    "adpcm",
    "bitcount",
    "blowfish",
    "bzip2",
    "crc32",
    "dijkstra",
    "ghostscript",
    "gsm",
    "ispell",
    "jpeg-c",
    "jpeg-d",
    "lame",
    "patricia",
    "qsort",
    "rijndael",
    "sha",
    "stringsearch",
    "stringsearch2",
    "susan",
    "tiff2bw",
    "tiff2rgba",
    "tiffdither",
    "tiffmedian",
];

/// Fixed suite of 23 benchmarks.
#[derive(Debug, Clone, Copy, Default)]
pub struct CbenchSimDataset;

impl CbenchSimDataset {
    pub const NAME: &'static str = "cbench-sim-v0";
}

impl Dataset for CbenchSimDataset {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn benchmarks(&self) -> Box<dyn Iterator<Item = BenchmarkUri> + Send + '_> {
        Box::new(
            CBENCH_SIM_BENCHMARKS
                .iter()
                .map(|name| BenchmarkUri::from_parts(Self::NAME, name)),
        )
    }

    fn contains(&self, benchmark: &BenchmarkUri) -> bool {
        benchmark.dataset() == Some(Self::NAME)
            && benchmark
                .name()
                .is_some_and(|name| CBENCH_SIM_BENCHMARKS.contains(&name))
    }
}

/// Unbounded dataset of numbered programs, `benchmark://generated-sim-v0/<n>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeneratedSimDataset;

impl GeneratedSimDataset {
    pub const NAME: &'static str = "generated-sim-v0";
}

impl Dataset for GeneratedSimDataset {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn benchmarks(&self) -> Box<dyn Iterator<Item = BenchmarkUri> + Send + '_> {
        Box::new((0u64..).map(|n| BenchmarkUri::from_parts(Self::NAME, &n.to_string())))
    }

    fn contains(&self, benchmark: &BenchmarkUri) -> bool {
        benchmark.dataset() == Some(Self::NAME)
            && benchmark
                .name()
                .is_some_and(|name| name.parse::<u64>().is_ok())
    }
}
