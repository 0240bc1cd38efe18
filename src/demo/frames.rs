use anyhow::{bail, Context, Result};
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{self, Read};

const CMD_SIGN_ON: u8 = 1;
const CMD_PACKET: u8 = 2;
const CMD_SYNC_TICK: u8 = 3;
const CMD_CONSOLE_CMD: u8 = 4;
const CMD_USER_CMD: u8 = 5;
const CMD_DATA_TABLES: u8 = 6;
const CMD_STOP: u8 = 7;
const CMD_CUSTOM_DATA: u8 = 8;
const CMD_STRING_TABLES: u8 = 9;

/// One command info block: i32 flags plus six 3-float view vectors. SignOn and
/// Packet frames carry two of these before their sequence numbers and payload.
const CMD_INFO_BYTES: u64 = 76;

#[derive(Debug, Default, Clone, Copy)]
pub struct FrameStats {
    pub frames: u64,
    pub packets: u64,
    pub last_tick: i32,
}

/// Walk the frame stream that follows the file header, skipping payloads,
/// until the stop frame. EOF at a frame boundary ends the demo (recorders cut
/// off without a stop frame); EOF inside a frame is truncation.
pub fn walk<R: Read>(r: &mut R) -> Result<FrameStats> {
    let mut stats = FrameStats::default();
    loop {
        let cmd = match r.read_u8() {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e).context("reading frame command"),
        };
        let tick = r.read_i32::<LittleEndian>().context("reading frame tick")?;
        let _player_slot = r.read_u8().context("reading frame player slot")?;
        stats.frames += 1;
        if tick > stats.last_tick {
            stats.last_tick = tick;
        }

        match cmd {
            CMD_SIGN_ON | CMD_PACKET => {
                skip(r, 2 * CMD_INFO_BYTES + 8)?;
                skip_sized(r)?;
                stats.packets += 1;
            }
            CMD_SYNC_TICK => {}
            CMD_CONSOLE_CMD | CMD_DATA_TABLES | CMD_STRING_TABLES => {
                skip_sized(r)?;
            }
            CMD_USER_CMD => {
                let _sequence = r
                    .read_i32::<LittleEndian>()
                    .context("reading user command sequence")?;
                skip_sized(r)?;
            }
            CMD_CUSTOM_DATA => {
                let _kind = r
                    .read_i32::<LittleEndian>()
                    .context("reading custom data kind")?;
                skip_sized(r)?;
            }
            CMD_STOP => break,
            other => bail!("unexpected frame command {} in frame {}", other, stats.frames),
        }
    }
    Ok(stats)
}

/// Skip a length-prefixed payload.
fn skip_sized<R: Read>(r: &mut R) -> Result<()> {
    let size = r.read_i32::<LittleEndian>().context("reading payload size")?;
    if size < 0 {
        bail!("negative payload size {}", size);
    }
    skip(r, size as u64)
}

fn skip<R: Read>(r: &mut R, n: u64) -> Result<()> {
    let copied = io::copy(&mut r.by_ref().take(n), &mut io::sink()).context("skipping payload")?;
    if copied != n {
        bail!("truncated frame: wanted {} payload bytes, got {}", n, copied);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::WriteBytesExt;

    fn frame_header(buf: &mut Vec<u8>, cmd: u8, tick: i32) {
        buf.push(cmd);
        buf.write_i32::<LittleEndian>(tick).unwrap();
        buf.push(0);
    }

    fn sized_payload(buf: &mut Vec<u8>, payload: &[u8]) {
        buf.write_i32::<LittleEndian>(payload.len() as i32).unwrap();
        buf.extend_from_slice(payload);
    }

    fn packet_frame(buf: &mut Vec<u8>, tick: i32, payload: &[u8]) {
        frame_header(buf, CMD_PACKET, tick);
        buf.extend_from_slice(&[0u8; (2 * CMD_INFO_BYTES + 8) as usize]);
        sized_payload(buf, payload);
    }

    #[test]
    fn walks_to_the_stop_frame() -> Result<()> {
        let mut buf = Vec::new();
        frame_header(&mut buf, CMD_SYNC_TICK, 0);
        packet_frame(&mut buf, 64, b"netdata");
        frame_header(&mut buf, CMD_CONSOLE_CMD, 65);
        sized_payload(&mut buf, b"say hi");
        frame_header(&mut buf, CMD_STOP, 66);
        buf.extend_from_slice(b"trailing junk after stop");

        let stats = walk(&mut buf.as_slice())?;
        assert_eq!(stats.frames, 4);
        assert_eq!(stats.packets, 1);
        assert_eq!(stats.last_tick, 66);
        Ok(())
    }

    #[test]
    fn eof_at_frame_boundary_ends_the_demo() -> Result<()> {
        let mut buf = Vec::new();
        packet_frame(&mut buf, 10, b"data");

        let stats = walk(&mut buf.as_slice())?;
        assert_eq!(stats.frames, 1);
        assert_eq!(stats.last_tick, 10);
        Ok(())
    }

    #[test]
    fn empty_stream_is_a_zero_frame_demo() -> Result<()> {
        let mut empty: &[u8] = &[];
        let stats = walk(&mut empty)?;
        assert_eq!(stats.frames, 0);
        Ok(())
    }

    #[test]
    fn truncated_payload_is_an_error() {
        let mut buf = Vec::new();
        frame_header(&mut buf, CMD_CONSOLE_CMD, 5);
        buf.write_i32::<LittleEndian>(100).unwrap();
        buf.extend_from_slice(b"short");

        let err = walk(&mut buf.as_slice()).unwrap_err();
        assert!(err.to_string().contains("truncated frame"));
    }

    #[test]
    fn unknown_frame_command_is_an_error() {
        let mut buf = Vec::new();
        frame_header(&mut buf, 42, 5);

        let err = walk(&mut buf.as_slice()).unwrap_err();
        assert!(err.to_string().contains("unexpected frame command 42"));
    }

    #[test]
    fn negative_payload_size_is_an_error() {
        let mut buf = Vec::new();
        frame_header(&mut buf, CMD_STRING_TABLES, 5);
        buf.write_i32::<LittleEndian>(-1).unwrap();

        let err = walk(&mut buf.as_slice()).unwrap_err();
        assert!(err.to_string().contains("negative payload size"));
    }
}
