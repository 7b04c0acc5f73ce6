use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::errors::{SessionError, SessionResult};

const TPKT_HEADER_LEN: usize = 4;
const TPKT_VERSION: u8 = 0x03;

/// Fixed part of an X.224 Data TPDU header that wraps every slow-path PDU
/// below this layer except the Connection Request/Confirm themselves:
/// `LI=2, code=0xF0 (DATA), EOT=0x80`. The negotiation PDUs carry their own
/// (longer, CR/CC-shaped) TPDU header as part of their own wire encoding,
/// so they bypass this constant entirely.
const TPDU_DATA_HEADER_LEN: usize = 3;
const TPDU_DATA_CODE: u8 = 0xF0;
const TPDU_DATA_LI: u8 = 0x02;
const TPDU_DATA_EOT: u8 = 0x80;

/// One framed unit read off the wire: either a slow-path frame (TPKT + X.224
/// Data TPDU, header already stripped) or a fast-path frame (first byte's
/// two high bits select the action). Any other first byte is
/// `SessionError::UnsupportedFraming`, which is always a fatal error for
/// the connection.
pub enum Frame {
    SlowPath(Vec<u8>),
    FastPath(Vec<u8>),
}

/// Reads one complete TPKT-length-delimited record and returns it byte for
/// byte, TPKT header included. Used only for the X.224 Connection
/// Request/Confirm, whose `Decode`/`Encode` implementations parse and write
/// their own TPKT + TPDU framing; wrapping them again here would double the
/// header.
pub async fn read_tpkt_record<S: AsyncRead + Unpin>(stream: &mut S) -> SessionResult<Vec<u8>> {
    let mut header = [0u8; TPKT_HEADER_LEN];
    stream.read_exact(&mut header).await?;
    if header[0] != TPKT_VERSION {
        return Err(SessionError::UnsupportedFraming { header: header[0] });
    }

    let length = u16::from_be_bytes([header[2], header[3]]) as usize;
    let mut body = vec![0u8; length.saturating_sub(TPKT_HEADER_LEN)];
    stream.read_exact(&mut body).await?;

    let mut record = Vec::with_capacity(length);
    record.extend_from_slice(&header);
    record.extend_from_slice(&body);
    Ok(record)
}

/// Writes an already-self-framed X.224 record (TPKT + TPDU header included),
/// as produced by `layers::x224::encode_request`/`encode_confirm`.
pub async fn write_tpkt_record<S: AsyncWrite + Unpin>(stream: &mut S, record: &[u8]) -> SessionResult<()> {
    stream.write_all(record).await?;
    Ok(())
}

/// Reads exactly one slow-path-or-fast-path frame from `stream`. Slow-path
/// frames are unwrapped down to their MCS-layer payload (the TPKT and X.224
/// Data TPDU headers are stripped, not returned).
pub async fn read_frame<S: AsyncRead + Unpin>(stream: &mut S) -> SessionResult<Frame> {
    let first_byte = stream.read_u8().await?;

    if first_byte == TPKT_VERSION {
        let mut rest_header = [0u8; TPKT_HEADER_LEN - 1];
        stream.read_exact(&mut rest_header).await?;
        let length = u16::from_be_bytes([rest_header[1], rest_header[2]]) as usize;

        let mut body = vec![0u8; length.saturating_sub(TPKT_HEADER_LEN)];
        stream.read_exact(&mut body).await?;

        if body.len() < TPDU_DATA_HEADER_LEN || body[1] != TPDU_DATA_CODE {
            return Err(SessionError::UnsupportedFraming { header: first_byte });
        }
        Ok(Frame::SlowPath(body.split_off(TPDU_DATA_HEADER_LEN)))
    } else if is_fast_path_action(first_byte) {
        let length_byte = stream.read_u8().await?;
        let (length, second_length_byte) = if length_byte & 0x80 != 0 {
            let second = stream.read_u8().await?;
            ((((u16::from(length_byte) & 0x7f) << 8) | u16::from(second)), Some(second))
        } else {
            (u16::from(length_byte), None)
        };

        let header_len = 2 + second_length_byte.is_some() as usize;
        let body_len = (length as usize).saturating_sub(header_len);
        let mut body = vec![0u8; body_len];
        stream.read_exact(&mut body).await?;

        let mut frame = Vec::with_capacity(length as usize);
        frame.push(first_byte);
        frame.push(length_byte);
        if let Some(second) = second_length_byte {
            frame.push(second);
        }
        frame.extend_from_slice(&body);
        Ok(Frame::FastPath(frame))
    } else {
        Err(SessionError::UnsupportedFraming { header: first_byte })
    }
}

const FASTPATH_ACTION_MASK: u8 = 0x03;
const FASTPATH_ACTION_FASTPATH: u8 = 0x00;

/// Only action bits `0x00` select fast-path framing; `0x03` is slow-path
/// (handled by the caller before this runs) and `0x01`/`0x02` are unused
/// action codes with no framing defined for them.
fn is_fast_path_action(first_byte: u8) -> bool {
    first_byte & FASTPATH_ACTION_MASK == FASTPATH_ACTION_FASTPATH
}

/// Wraps `payload` in a TPKT header and an X.224 Data TPDU header and writes
/// the result — the framing every MCS-layer slow-path PDU rides on once
/// negotiation has completed.
pub async fn write_slow_path<S: AsyncWrite + Unpin>(stream: &mut S, payload: &[u8]) -> SessionResult<()> {
    let length = (TPKT_HEADER_LEN + TPDU_DATA_HEADER_LEN + payload.len()) as u16;
    let mut frame = Vec::with_capacity(length as usize);
    frame.push(TPKT_VERSION);
    frame.push(0);
    frame.extend_from_slice(&length.to_be_bytes());
    frame.push(TPDU_DATA_LI);
    frame.push(TPDU_DATA_CODE);
    frame.push(TPDU_DATA_EOT);
    frame.extend_from_slice(payload);
    stream.write_all(&frame).await?;
    Ok(())
}

/// Writes a pre-framed fast-path payload (the fast-path parser already
/// produced the action/length header bytes).
pub async fn write_fast_path<S: AsyncWrite + Unpin>(stream: &mut S, framed: &[u8]) -> SessionResult<()> {
    stream.write_all(framed).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[tokio::test]
    async fn reads_a_slow_path_frame_stripped_of_its_headers() {
        // tpkt(version=3, reserved=0, length=11) + tpdu data(li=2,code=0xF0,eot=0x80) + 4-byte payload
        let wire = vec![0x03, 0x00, 0x00, 0x0B, 0x02, 0xF0, 0x80, 0xAA, 0xBB, 0xCC, 0xDD];
        let mut reader = Cursor::new(wire);

        let frame = read_frame(&mut reader).await.unwrap();
        match frame {
            Frame::SlowPath(bytes) => assert_eq!(bytes, vec![0xAA, 0xBB, 0xCC, 0xDD]),
            Frame::FastPath(_) => panic!("expected a slow-path frame"),
        }
    }

    #[tokio::test]
    async fn a_non_data_tpdu_is_rejected_as_slow_path_framing() {
        // tpdu code 0xE0 (CONNECTION_REQUEST) can never appear wrapped as a
        // bare slow-path frame; only X.224 Data TPDUs ride this path
        let wire = vec![0x03, 0x00, 0x00, 0x0B, 0x02, 0xE0, 0x00, 0xAA, 0xBB, 0xCC, 0xDD];
        let mut reader = Cursor::new(wire);

        let err = read_frame(&mut reader).await.unwrap_err();
        assert!(matches!(err, SessionError::UnsupportedFraming { header: 0x03 }));
    }

    #[tokio::test]
    async fn reads_a_short_form_fast_path_frame() {
        // action/flags byte with the two high bits not matching the TPKT
        // version, one-byte length (high bit clear), then the body
        let wire = vec![0x00, 0x05, 0x01, 0x02, 0x03];
        let mut reader = Cursor::new(wire.clone());

        let frame = read_frame(&mut reader).await.unwrap();
        match frame {
            Frame::FastPath(bytes) => assert_eq!(bytes, wire),
            Frame::SlowPath(_) => panic!("expected a fast-path frame"),
        }
    }

    #[tokio::test]
    async fn reads_a_long_form_fast_path_frame() {
        // high bit set on the first length byte selects the two-byte length
        let body = vec![0xEE; 130];
        let length = (2 + body.len()) as u16;
        let mut wire = vec![0x00, 0x80 | ((length >> 8) as u8), (length & 0xFF) as u8];
        wire.extend_from_slice(&body);
        let mut reader = Cursor::new(wire.clone());

        let frame = read_frame(&mut reader).await.unwrap();
        match frame {
            Frame::FastPath(bytes) => assert_eq!(bytes, wire),
            Frame::SlowPath(_) => panic!("expected a fast-path frame"),
        }
    }

    #[tokio::test]
    async fn unknown_header_byte_is_rejected() {
        // low two bits equal TPKT_VERSION's low two bits, but the byte
        // itself isn't 0x03, so it's neither slow-path nor fast-path
        let mut reader = Cursor::new(vec![0x07]);

        let err = read_frame(&mut reader).await.unwrap_err();
        assert!(matches!(err, SessionError::UnsupportedFraming { header: 0x07 }));
    }

    #[tokio::test]
    async fn action_bits_01_are_rejected_not_treated_as_fast_path() {
        let mut reader = Cursor::new(vec![0x01]);

        let err = read_frame(&mut reader).await.unwrap_err();
        assert!(matches!(err, SessionError::UnsupportedFraming { header: 0x01 }));
    }

    #[tokio::test]
    async fn action_bits_02_are_rejected_not_treated_as_fast_path() {
        let mut reader = Cursor::new(vec![0x02]);

        let err = read_frame(&mut reader).await.unwrap_err();
        assert!(matches!(err, SessionError::UnsupportedFraming { header: 0x02 }));
    }

    #[tokio::test]
    async fn write_slow_path_produces_a_well_formed_header() {
        let mut buf = Vec::new();
        write_slow_path(&mut buf, &[0x11, 0x22]).await.unwrap();

        assert_eq!(buf, vec![0x03, 0x00, 0x00, 0x09, 0x02, 0xF0, 0x80, 0x11, 0x22]);
    }

    #[tokio::test]
    async fn write_then_read_slow_path_roundtrips() {
        let payload = vec![0xDE, 0xAD, 0xBE, 0xEF, 0x01];
        let mut buf = Vec::new();
        write_slow_path(&mut buf, &payload).await.unwrap();

        let mut reader = Cursor::new(buf);
        match read_frame(&mut reader).await.unwrap() {
            Frame::SlowPath(frame) => assert_eq!(frame, payload),
            Frame::FastPath(_) => panic!("expected a slow-path frame"),
        }
    }

    #[tokio::test]
    async fn read_tpkt_record_returns_the_header_untouched() {
        let wire = vec![0x03, 0x00, 0x00, 0x07, 0xAA, 0xBB, 0xCC];
        let mut reader = Cursor::new(wire.clone());

        let record = read_tpkt_record(&mut reader).await.unwrap();
        assert_eq!(record, wire);
    }

    #[tokio::test]
    async fn write_tpkt_record_writes_bytes_verbatim() {
        let record = vec![0x03, 0x00, 0x00, 0x07, 0xAA, 0xBB, 0xCC];
        let mut buf = Vec::new();
        write_tpkt_record(&mut buf, &record).await.unwrap();
        assert_eq!(buf, record);
    }
}
