use domain::{DeviceId, DeviceInfo, DeviceStatus};

#[test]
fn device_id_parses_decimal() {
    let id: DeviceId = "42".parse().expect("parse");
    assert_eq!(id.get(), 42);
    let padded: DeviceId = " 7 ".parse().expect("parse");
    assert_eq!(padded, DeviceId::new(7));
}

#[test]
fn device_id_rejects_blank_and_garbage() {
    assert!("".parse::<DeviceId>().is_err());
    assert!("   ".parse::<DeviceId>().is_err());
    assert!("abc".parse::<DeviceId>().is_err());
    assert!("-1".parse::<DeviceId>().is_err());

    let err = "abc".parse::<DeviceId>().expect_err("garbage");
    assert_eq!(err.to_string(), "invalid device id: \"abc\"");
    let _: &dyn std::error::Error = &err;
}

#[test]
fn status_codes_match_system_of_record() {
    assert_eq!(DeviceStatus::Offline.code(), 0);
    assert_eq!(DeviceStatus::Online.code(), 1);
    assert_eq!(DeviceStatus::NotEnabled.code(), 2);
    assert_eq!(DeviceStatus::from_code(2), Some(DeviceStatus::NotEnabled));
    assert_eq!(DeviceStatus::from_code(9), None);
    assert_eq!(DeviceStatus::from_presence(true), DeviceStatus::Online);
    assert_eq!(DeviceStatus::from_presence(false), DeviceStatus::Offline);
}

#[test]
fn device_info_serializes_for_cache() {
    let info = DeviceInfo {
        id: DeviceId::new(5),
        sn: "SN-5".to_string(),
        status: DeviceStatus::NotEnabled,
        last_login_time_ms: 1000,
    };
    let json = serde_json::to_string(&info).expect("serialize");
    assert!(json.contains("\"status\":\"NOT_ENABLED\""));
    assert!(json.contains("\"lastLoginTimeMs\":1000"));
    let back: DeviceInfo = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back, info);
}

#[test]
fn status_identifier_matches_serde() {
    for status in [
        DeviceStatus::Offline,
        DeviceStatus::Online,
        DeviceStatus::NotEnabled,
    ] {
        let json = serde_json::to_string(&status).expect("serialize");
        assert_eq!(json, format!("\"{}\"", status.as_str()));
    }
}
