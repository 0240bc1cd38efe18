use crate::bundle::Record;
use anyhow::{bail, Context, Result};
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Read;

const MAGIC_LEN: usize = 8;
const STRING_LEN: usize = 260;

const SOURCE1_MAGIC: &str = "HL2DEMO";
const SOURCE2_MAGIC: &str = "PBDEMS2";

/// Demo protocol this decoder understands.
const SUPPORTED_DEMO_PROTOCOL: i32 = 4;

/// Fixed-layout file header at the front of a Source-engine demo: the magic,
/// two protocol numbers, four NUL-padded 260-byte strings, then playback
/// metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    pub demo_protocol: i32,
    pub network_protocol: i32,
    pub server_name: String,
    pub client_name: String,
    pub map_name: String,
    pub game_dir: String,
    pub playback_time: f32,
    pub playback_ticks: i32,
    pub playback_frames: i32,
    pub signon_length: i32,
}

impl Header {
    pub fn read<R: Read>(r: &mut R) -> Result<Header> {
        let magic = read_fixed_string(r, MAGIC_LEN, "demo magic")?;
        match magic.as_str() {
            SOURCE1_MAGIC => {}
            SOURCE2_MAGIC => bail!("Source 2 demo: not supported by this decoder"),
            other => bail!("not a Source engine demo (magic `{}`)", other),
        }

        let demo_protocol = r
            .read_i32::<LittleEndian>()
            .context("reading demo protocol")?;
        if demo_protocol != SUPPORTED_DEMO_PROTOCOL {
            bail!("unsupported demo protocol {}", demo_protocol);
        }

        Ok(Header {
            demo_protocol,
            network_protocol: r
                .read_i32::<LittleEndian>()
                .context("reading network protocol")?,
            server_name: read_fixed_string(r, STRING_LEN, "server name")?,
            client_name: read_fixed_string(r, STRING_LEN, "client name")?,
            map_name: read_fixed_string(r, STRING_LEN, "map name")?,
            game_dir: read_fixed_string(r, STRING_LEN, "game directory")?,
            playback_time: r
                .read_f32::<LittleEndian>()
                .context("reading playback time")?,
            playback_ticks: r
                .read_i32::<LittleEndian>()
                .context("reading playback ticks")?,
            playback_frames: r
                .read_i32::<LittleEndian>()
                .context("reading playback frames")?,
            signon_length: r
                .read_i32::<LittleEndian>()
                .context("reading signon length")?,
        })
    }

    /// The `header` category record, field order matching the on-disk layout.
    pub fn into_record(self) -> Record {
        let mut record = Record::new();
        record.push("demo_protocol", i64::from(self.demo_protocol));
        record.push("network_protocol", i64::from(self.network_protocol));
        record.push("server_name", self.server_name);
        record.push("client_name", self.client_name);
        record.push("map_name", self.map_name);
        record.push("game_dir", self.game_dir);
        record.push("playback_time", f64::from(self.playback_time));
        record.push("playback_ticks", i64::from(self.playback_ticks));
        record.push("playback_frames", i64::from(self.playback_frames));
        record.push("signon_length", i64::from(self.signon_length));
        record
    }
}

/// Read a NUL-padded fixed-width string field.
fn read_fixed_string<R: Read>(r: &mut R, len: usize, what: &str) -> Result<String> {
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)
        .with_context(|| format!("reading {}", what))?;
    let end = buf.iter().position(|b| *b == 0).unwrap_or(len);
    Ok(String::from_utf8_lossy(&buf[..end]).into_owned())
}
