use macprofile_canonical::{dict, Normalizer, PatternFormat, ProfileDocument, PAYLOAD_UUID};

fn main() {
    let normalizer = Normalizer::new(PatternFormat::uuid_upper());
    let document = ProfileDocument::from_value(dict! {
        "PayloadIdentifier" => "com.example.wifi",
        "PayloadType" => "Configuration",
        "PayloadVersion" => 1i64,
        "PayloadContent" => vec![dict! {
            "PayloadType" => "com.apple.wifi.managed",
            "SSID_STR" => "example",
            "AutoJoin" => true,
        }],
    })
    .expect("dictionary");

    let normalized = normalizer.normalize(&document, None);
    match normalized.get(PAYLOAD_UUID) {
        Some(identity) => println!("{:?}", identity),
        None => {
            eprintln!("normalization produced no identity");
            std::process::exit(1);
        }
    }
}
