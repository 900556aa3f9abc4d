use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::codec::Codec;
use crate::task::Task;
use crate::types::Payload;
use crate::QueueResult;

/// Wire form of a dispatched task: its registered name and its own
/// MessagePack encoding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskEnvelope {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Data")]
    pub data: Bytes,
}

impl TaskEnvelope {
    pub fn seal<T: Task>(name: impl Into<String>, task: &T) -> QueueResult<Self> {
        Ok(Self {
            name: name.into(),
            data: Bytes::from(Codec::MsgPack.encode(task)?),
        })
    }

    /// Decode the task state
    pub fn open<T: DeserializeOwned>(&self) -> QueueResult<T> {
        Codec::MsgPack.decode(&self.data)
    }

    pub fn to_payload(&self) -> QueueResult<Payload> {
        Payload::with_codec(Codec::MsgPack, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TaskError;
    use async_trait::async_trait;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Thumbnail {
        image: String,
        size: u32,
    }

    #[async_trait]
    impl Task for Thumbnail {
        async fn handle(&self) -> Result<(), TaskError> {
            Ok(())
        }
    }

    #[derive(Deserialize)]
    struct Wire {
        #[serde(rename = "Name")]
        name: String,
        #[serde(rename = "Data")]
        data: Bytes,
    }

    #[test]
    fn test_envelope_wire_names() {
        let task = Thumbnail {
            image: "cat.png".into(),
            size: 128,
        };
        let payload = TaskEnvelope::seal("thumbnail", &task)
            .unwrap()
            .to_payload()
            .unwrap();
        assert_eq!(payload.codec(), Codec::MsgPack);

        let wire: Wire = rmp_serde::from_slice(payload.as_slice()).unwrap();
        assert_eq!(wire.name, "thumbnail");

        let decoded: Thumbnail = rmp_serde::from_slice(&wire.data).unwrap();
        assert_eq!(decoded, task);
    }

    #[test]
    fn test_open_wrong_task_type() {
        let envelope = TaskEnvelope::seal(
            "thumbnail",
            &Thumbnail {
                image: "cat.png".into(),
                size: 128,
            },
        )
        .unwrap();

        assert!(envelope.open::<Vec<u64>>().is_err());
    }
}
