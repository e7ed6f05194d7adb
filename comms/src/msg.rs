use crate::{CodecErr, Deserialize, Params, Serialize};

pub type Tag = u8;
pub const TAG_SIZE: usize = size_of::<Tag>();

pub const FETCH_REQUEST: Tag = 1;
pub const FETCH_RESPONSE: Tag = 2;
pub const RETURNS_REQUEST: Tag = 3;
pub const SIGNAL_POLL: Tag = 4;
pub const SIGNAL_RESPONSE: Tag = 5;

const NO_SIGNAL: u8 = 0;
const SIGNAL_PRESENT: u8 = 1;

/// The application layer message between a worker and its parameter source.
#[derive(Debug, Clone, PartialEq)]
pub enum Msg<'a> {
    /// Worker asks for the current parameter snapshot.
    FetchRequest,
    /// Source answers a `FetchRequest` with its snapshot.
    FetchResponse(Params<'a>),
    /// Worker reports a scalar return, never acknowledged.
    ReturnsRequest(f64),
    /// Worker asks for a pending out of band signal.
    SignalPoll,
    /// Source answers a `SignalPoll`, `None` meaning no signal is pending.
    SignalResponse(Option<&'a [u8]>),
}

impl Msg<'_> {
    /// The wire tag of this message.
    pub fn tag(&self) -> Tag {
        match self {
            Msg::FetchRequest => FETCH_REQUEST,
            Msg::FetchResponse(_) => FETCH_RESPONSE,
            Msg::ReturnsRequest(_) => RETURNS_REQUEST,
            Msg::SignalPoll => SIGNAL_POLL,
            Msg::SignalResponse(_) => SIGNAL_RESPONSE,
        }
    }

    /// A short human readable name for this message's kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Msg::FetchRequest => "fetch_request",
            Msg::FetchResponse(_) => "fetch_response",
            Msg::ReturnsRequest(_) => "returns_request",
            Msg::SignalPoll => "signal_poll",
            Msg::SignalResponse(_) => "signal_response",
        }
    }

    fn expect_empty(kind: &'static str, payload: &[u8]) -> Result<(), CodecErr> {
        if !payload.is_empty() {
            return Err(CodecErr::PayloadLength {
                kind,
                expected: 0,
                got: payload.len(),
            });
        }

        Ok(())
    }
}

impl<'a> Serialize<'a> for Msg<'a> {
    fn serialize(&'a self, buf: &mut Vec<u8>) -> Option<&'a [u8]> {
        buf.push(self.tag());

        match self {
            Msg::FetchRequest | Msg::SignalPoll => None,
            Msg::FetchResponse(params) => Some(params.write_header(buf)),
            Msg::ReturnsRequest(value) => {
                buf.extend_from_slice(&value.to_le_bytes());
                None
            }
            Msg::SignalResponse(None) => {
                buf.push(NO_SIGNAL);
                None
            }
            Msg::SignalResponse(Some(signal)) => {
                buf.push(SIGNAL_PRESENT);
                Some(*signal)
            }
        }
    }
}

impl<'a> Deserialize<'a> for Msg<'a> {
    fn deserialize(body: &'a [u8]) -> Result<Self, CodecErr> {
        let Some((&tag, payload)) = body.split_first() else {
            return Err(CodecErr::Truncated {
                needed: TAG_SIZE,
                got: 0,
            });
        };

        match tag {
            FETCH_REQUEST => {
                Self::expect_empty("fetch_request", payload)?;
                Ok(Msg::FetchRequest)
            }
            FETCH_RESPONSE => Ok(Msg::FetchResponse(Params::parse(payload)?)),
            RETURNS_REQUEST => {
                let value: [u8; 8] = payload.try_into().map_err(|_| CodecErr::PayloadLength {
                    kind: "returns_request",
                    expected: size_of::<f64>(),
                    got: payload.len(),
                })?;

                Ok(Msg::ReturnsRequest(f64::from_le_bytes(value)))
            }
            SIGNAL_POLL => {
                Self::expect_empty("signal_poll", payload)?;
                Ok(Msg::SignalPoll)
            }
            SIGNAL_RESPONSE => match payload.split_first() {
                None => Err(CodecErr::Truncated { needed: 1, got: 0 }),
                Some((&NO_SIGNAL, [])) => Ok(Msg::SignalResponse(None)),
                Some((&NO_SIGNAL, rest)) => Err(CodecErr::PayloadLength {
                    kind: "signal_response",
                    expected: 1,
                    got: 1 + rest.len(),
                }),
                Some((&SIGNAL_PRESENT, signal)) => Ok(Msg::SignalResponse(Some(signal))),
                Some((&flag, _)) => Err(CodecErr::InvalidSignalFlag(flag)),
            },
            tag => Err(CodecErr::UnknownTag(tag)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(msg: &Msg<'_>) -> Vec<u8> {
        let mut buf = Vec::new();
        let tail = msg.serialize(&mut buf);
        buf.extend_from_slice(tail.unwrap_or_default());
        buf
    }

    #[test]
    fn requests_are_bare_tags() {
        assert_eq!(body(&Msg::FetchRequest), [FETCH_REQUEST]);
        assert_eq!(body(&Msg::SignalPoll), [SIGNAL_POLL]);
    }

    #[test]
    fn fetch_response_layout() {
        let values = [1.0, 2.0, 3.0];
        let bytes = body(&Msg::FetchResponse(Params::from_values(&values)));

        assert_eq!(bytes[0], FETCH_RESPONSE);
        assert_eq!(&bytes[1..5], &3u32.to_le_bytes());
        assert_eq!(&bytes[5..13], &1.0f64.to_le_bytes());
        assert_eq!(bytes.len(), 1 + 4 + 3 * 8);

        let Msg::FetchResponse(params) = Msg::deserialize(&bytes).unwrap() else {
            panic!("unexpected message");
        };
        assert_eq!(params.to_vec(), values);
    }

    #[test]
    fn returns_request_roundtrip() {
        let bytes = body(&Msg::ReturnsRequest(-1.25));
        assert_eq!(Msg::deserialize(&bytes).unwrap(), Msg::ReturnsRequest(-1.25));
    }

    #[test]
    fn signal_response_variants() {
        assert_eq!(body(&Msg::SignalResponse(None)), [SIGNAL_RESPONSE, 0]);

        let bytes = body(&Msg::SignalResponse(Some(b"stop".as_slice())));
        assert_eq!(bytes, [SIGNAL_RESPONSE, 1, b's', b't', b'o', b'p']);
        assert_eq!(
            Msg::deserialize(&bytes).unwrap(),
            Msg::SignalResponse(Some(b"stop".as_slice()))
        );

        // A present but empty signal is distinct from no signal at all.
        let bytes = body(&Msg::SignalResponse(Some(b"".as_slice())));
        assert_eq!(
            Msg::deserialize(&bytes).unwrap(),
            Msg::SignalResponse(Some(b"".as_slice()))
        );
    }

    #[test]
    fn rejects_bad_frames() {
        assert_eq!(
            Msg::deserialize(&[]),
            Err(CodecErr::Truncated { needed: 1, got: 0 })
        );
        assert_eq!(Msg::deserialize(&[9]), Err(CodecErr::UnknownTag(9)));
        assert_eq!(
            Msg::deserialize(&[SIGNAL_RESPONSE, 7]),
            Err(CodecErr::InvalidSignalFlag(7))
        );
        assert!(Msg::deserialize(&[SIGNAL_RESPONSE]).is_err());
        assert!(Msg::deserialize(&[SIGNAL_RESPONSE, 0, 1]).is_err());
        assert!(Msg::deserialize(&[FETCH_REQUEST, 0]).is_err());
        assert!(Msg::deserialize(&[RETURNS_REQUEST, 0, 0, 0]).is_err());
    }

    #[test]
    fn truncated_fetch_response_is_rejected() {
        let values = [1.0, 2.0];
        let mut bytes = body(&Msg::FetchResponse(Params::from_values(&values)));
        bytes.truncate(bytes.len() - 3);

        assert!(matches!(
            Msg::deserialize(&bytes),
            Err(CodecErr::CountMismatch { declared: 2, .. })
        ));
    }
}
