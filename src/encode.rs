use base64::prelude::*;
use clap::ValueEnum;
use strum_macros::Display;
use urlencoding::{decode, encode};

use crate::errors::AttackError;

#[derive(Display, Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Encoding {
    Hex,
    B64,
    B64Url,
    Url,
}

pub fn encode_chain(bytes: &[u8], encodings: &[Encoding]) -> Result<String, AttackError> {
    let mut data = bytes.to_vec();
    // applied in reverse declaration order so the first encoding listed is
    // the outermost, the one decode_chain peels off first
    for encoding in encodings.iter().rev() {
        data = match encoding {
            Encoding::Hex => hex::encode(data).into_bytes(),
            Encoding::B64 => BASE64_STANDARD.encode(data).into_bytes(),
            Encoding::B64Url => BASE64_URL_SAFE.encode(data).into_bytes(),
            Encoding::Url => encode(&into_utf8(data)?).into_owned().into_bytes(),
        };
    }
    into_utf8(data)
}

pub fn decode_chain(text: &str, encodings: &[Encoding]) -> Result<Vec<u8>, AttackError> {
    let mut data = text.as_bytes().to_vec();
    for encoding in encodings {
        data = match encoding {
            Encoding::Hex => hex::decode(into_utf8(data)?)
                .map_err(|err| AttackError::InvalidInput(format!("bad hex: {err}")))?,
            Encoding::B64 => BASE64_STANDARD
                .decode(into_utf8(data)?)
                .map_err(|err| AttackError::InvalidInput(format!("bad base64: {err}")))?,
            Encoding::B64Url => BASE64_URL_SAFE
                .decode(into_utf8(data)?)
                .map_err(|err| AttackError::InvalidInput(format!("bad url-safe base64: {err}")))?,
            Encoding::Url => decode(&into_utf8(data)?)
                .map_err(|err| AttackError::InvalidInput(format!("bad url encoding: {err}")))?
                .into_owned()
                .into_bytes(),
        };
    }
    Ok(data)
}

fn into_utf8(data: Vec<u8>) -> Result<String, AttackError> {
    String::from_utf8(data)
        .map_err(|_| AttackError::InvalidInput("intermediate encoding is not utf-8".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trips() {
        let encoded = encode_chain(&[0xDE, 0xAD], &[Encoding::Hex]).unwrap();
        assert_eq!(encoded, "dead");
        assert_eq!(decode_chain(&encoded, &[Encoding::Hex]).unwrap(), [0xDE, 0xAD]);
    }

    #[test]
    fn chains_apply_outermost_first() {
        // url-encoded base64: decode peels url first, encode applies it last
        let raw = vec![0xFBu8, 0xFF];
        let chain = [Encoding::Url, Encoding::B64];
        let encoded = encode_chain(&raw, &chain).unwrap();
        assert_eq!(encoded, "%2B%2F8%3D");
        assert_eq!(decode_chain(&encoded, &chain).unwrap(), raw);
    }

    #[test]
    fn rejects_garbage() {
        assert!(decode_chain("zz!", &[Encoding::Hex]).is_err());
        assert!(decode_chain("????", &[Encoding::B64]).is_err());
    }
}
