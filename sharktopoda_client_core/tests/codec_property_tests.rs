//! Property tests for the datagram codec

use proptest::prelude::*;
use sharktopoda_client_core::protocol::codec::{Codec, Inbound};
use sharktopoda_client_core::{Command, FrameDirection, Localization, MessageKind, Response};
use uuid::Uuid;

fn any_kind() -> impl Strategy<Value = MessageKind> {
    prop::sample::select(MessageKind::ALL.to_vec())
}

fn any_localization() -> impl Strategy<Value = Localization> {
    (
        "[A-Za-z][A-Za-z ]{0,30}",
        0i64..10_000_000,
        0i32..4_000,
        0i32..4_000,
        1i32..4_000,
        1i32..4_000,
    )
        .prop_map(|(concept, elapsed, x, y, width, height)| {
            Localization::new(concept, elapsed, x, y, width, height)
        })
}

fn any_command() -> impl Strategy<Value = Command> {
    let uuid = any::<u128>().prop_map(Uuid::from_u128);
    prop_oneof![
        (uuid.clone(), "[a-z]{1,12}").prop_map(|(uuid, name)| Command::Open {
            uuid,
            url: format!("file:///videos/{name}.mp4"),
        }),
        uuid.clone().prop_map(|uuid| Command::Close { uuid }),
        uuid.clone().prop_map(|uuid| Command::Pause { uuid }),
        (uuid.clone(), prop::option::of(0.1f64..8.0))
            .prop_map(|(uuid, rate)| Command::Play { uuid, rate }),
        (uuid.clone(), 0i64..86_400_000).prop_map(|(uuid, elapsed_time_millis)| {
            Command::SeekElapsedTime {
                uuid,
                elapsed_time_millis,
            }
        }),
        (uuid.clone(), any::<bool>()).prop_map(|(uuid, forward)| Command::FrameAdvance {
            uuid,
            direction: if forward {
                FrameDirection::Forward
            } else {
                FrameDirection::Backward
            },
        }),
        uuid.clone().prop_map(|uuid| Command::RequestPlayerState { uuid }),
        uuid.prop_map(|uuid| Command::ClearLocalizations { uuid }),
        Just(Command::RequestInformation),
        Just(Command::Ping),
    ]
}

/// The answer a player builds from a decoded command
fn peer_ack(command: &serde_json::Value) -> serde_json::Value {
    let mut ack = serde_json::json!({
        "response": command["command"].clone(),
        "status": "ok",
    });
    if let Some(uuid) = command.get("uuid") {
        ack["uuid"] = uuid.clone();
    }
    ack
}

proptest! {
    #[test]
    fn test_peer_response_correlates_back(command in any_command()) {
        let codec = Codec::new();
        prop_assert!(command.validate().is_ok());

        let data = codec.encode_command(&command).unwrap();
        prop_assert_eq!(&data, &codec.encode_command(&command).unwrap());

        let sent: serde_json::Value = serde_json::from_slice(&data).unwrap();
        let reply = serde_json::to_vec(&peer_ack(&sent)).unwrap();

        match codec.decode(&reply).unwrap() {
            Inbound::Response(response) => {
                prop_assert!(command.correlation_key().matches(&response));
                prop_assert_eq!(response.uuid, command.video_uuid());
            }
            Inbound::Command(other) => prop_assert!(false, "decoded {:?}", other),
        }
    }

    #[test]
    fn test_response_for_other_video_does_not_correlate(
        command in any_command(),
        other in any::<u128>().prop_map(Uuid::from_u128),
    ) {
        prop_assume!(command.video_uuid().is_some_and(|uuid| uuid != other));
        let response = Response::ok(command.kind()).with_uuid(other);
        prop_assert!(!command.correlation_key().matches(&response));
    }

    #[test]
    fn test_decode_never_panics(data: Vec<u8>) {
        let codec = Codec::new();
        let _ = codec.decode(&data);
    }

    #[test]
    fn test_every_ack_decodes_as_ok_response(kind in any_kind()) {
        let codec = Codec::new();
        let ack = codec.encode_ack(kind).unwrap();

        match codec.decode(&ack).unwrap() {
            Inbound::Response(response) => {
                prop_assert_eq!(response.kind, kind);
                prop_assert!(response.is_ok());
            }
            Inbound::Command(command) => prop_assert!(false, "decoded {:?}", command),
        }
    }

    #[test]
    fn test_failed_response_keeps_cause(kind in any_kind(), cause in "[ -~]{1,80}") {
        let codec = Codec::new();
        let response = Response::failed(kind, cause.clone()).with_uuid(Uuid::new_v4());
        let data = codec.encode_response(&response).unwrap();

        match codec.decode(&data).unwrap() {
            Inbound::Response(decoded) => prop_assert_eq!(decoded, response),
            Inbound::Command(command) => prop_assert!(false, "decoded {:?}", command),
        }
    }

    #[test]
    fn test_localization_commands_are_single_json_objects(
        localizations in prop::collection::vec(any_localization(), 1..20)
    ) {
        let codec = Codec::new();
        let command = Command::AddLocalizations {
            uuid: Uuid::new_v4(),
            localizations: localizations.clone(),
        };
        prop_assert!(command.validate().is_ok());

        let data = codec.encode_command(&command).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&data).unwrap();
        prop_assert_eq!(value["command"].as_str(), Some("add localizations"));
        prop_assert_eq!(
            value["localizations"].as_array().map(Vec::len),
            Some(localizations.len())
        );
    }
}
