use assert_cmd::Command;

fn fixture(name: &str) -> std::path::PathBuf {
    std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("fixtures")
        .join(name)
}

#[test]
fn pages_fall_back_to_fragments_when_no_page_collection() {
    let file = fixture("fragments.json");
    let out = Command::new(assert_cmd::cargo::cargo_bin!("overlap"))
        .env_remove("OVERLAP_ENV_FILE")
        .env_remove("OVERLAP_TYPESENSE_URL")
        .env_remove("OVERLAP_TYPESENSE_API_KEY")
        .args([
            "pages",
            "--site-a",
            "servicesaustralia.gov.au",
            "--site-b",
            "dss.gov.au",
            "--fragments-file",
            file.to_str().unwrap(),
        ])
        .output()
        .expect("run overlap pages");
    assert!(
        out.status.success(),
        "overlap pages failed: {}",
        String::from_utf8_lossy(&out.stderr)
    );

    let v: serde_json::Value = serde_json::from_slice(&out.stdout).expect("parse report json");
    assert_eq!(v["kind"].as_str(), Some("page_overlap"));
    assert_eq!(v["params"]["threshold"].as_f64(), Some(0.4));
    let warnings: Vec<&str> = v["warnings"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|w| w.as_str())
        .collect();
    assert!(warnings.contains(&"page_collection_empty_derived_from_fragments"));
    assert_eq!(v["counts"]["docs_a"].as_u64(), Some(2));
    assert_eq!(v["counts"]["docs_b"].as_u64(), Some(3));

    let pairs = v["pairs"].as_array().expect("pairs");
    assert!(pairs.iter().any(|p| {
        p["a_id"].as_str() == Some("https://www.servicesaustralia.gov.au/age-pension")
            && p["b_id"].as_str() == Some("https://www.dss.gov.au/seniors/age-pension")
    }));
}

#[test]
fn pages_read_a_precomputed_page_dump() {
    let tmp = tempfile::tempdir().unwrap();
    let pages = tmp.path().join("pages.json");
    std::fs::write(
        &pages,
        serde_json::json!([
            {"base_url": "https://a.gov.au/carer", "title": "Carer Payment",
             "content_text": "carer payment support", "life_events": ["caring"]},
            {"base_url": "https://b.gov.au/carers", "title": "Carer Payment",
             "content_text": "carer payment support", "life_events": ["caring"]}
        ])
        .to_string(),
    )
    .unwrap();

    let out = Command::new(assert_cmd::cargo::cargo_bin!("overlap"))
        .env_remove("OVERLAP_ENV_FILE")
        .args([
            "pages",
            "--site-a",
            "a.gov.au",
            "--site-b",
            "b.gov.au",
            "--pages-file",
            pages.to_str().unwrap(),
        ])
        .output()
        .expect("run overlap pages");
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["warnings"].as_array().map(Vec::len), Some(0));
    assert_eq!(v["pairs"][0]["tags_sim"].as_f64(), Some(1.0));
    assert_eq!(v["pairs"][0]["score"].as_f64(), Some(1.0));
}
