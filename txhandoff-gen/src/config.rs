use std::path::PathBuf;

use structopt::StructOpt;

#[derive(Clone, Debug, StructOpt)]
#[structopt(name = "txgen", about = "Push synthetic bursts through a transmit path")]
pub struct Options {
    /// The transmit path configuration file.
    #[structopt(parse(from_os_str))]
    pub config: PathBuf,
    /// Number of bursts to generate.
    #[structopt(short = "n", long = "bursts", default_value = "100000")]
    pub bursts: usize,
    /// Packets per burst, capped by the batch size of each interface.
    #[structopt(short = "b", long = "burst-size")]
    pub burst_size: Option<usize>,
    /// Payload length of each packet.
    #[structopt(short = "l", long = "length", default_value = "1470")]
    pub length: usize,
    /// Number of packet buffers.
    #[structopt(long = "buffers", default_value = "8192")]
    pub buffers: usize,
    /// Number interfaces by their order in the configuration instead of asking the host.
    #[structopt(long = "offline")]
    pub offline: bool,
}

impl Options {
    pub fn from_args() -> Self {
        StructOpt::from_args()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iperf_style_flags() {
        let options = Options::from_iter(&["txgen", "tx.toml", "-n", "10", "-l", "64", "--offline"]);
        assert_eq!(options.config, PathBuf::from("tx.toml"));
        assert_eq!(options.bursts, 10);
        assert_eq!(options.length, 64);
        assert_eq!(options.burst_size, None);
        assert_eq!(options.buffers, 8192);
        assert!(options.offline);
    }
}
