//! Integration tests for disease resolution over the static file
//!
//! Every test writes its own database into a temporary directory and goes
//! through `select_store`, the same path the binary takes at startup.

use agriguard::diseases::{
    select_store, Category, DiseaseService, StoreConfig, StoreSource, TreatmentQuery, Urgency,
};
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

const DATABASE: &str = r#"{
    "metadata": {"version": "2.0", "data_source": "test fixture"},
    "diseases": {
        "MLN": {
            "name": "Maize Lethal Necrosis",
            "urgency": "critical",
            "symptoms": ["Chlorotic mottle", "Leaf necrosis"],
            "crops": ["maize"],
            "pathogens": [{"virus": "MCMV", "full_name": "Maize chlorotic mottle virus"}],
            "vectors": [{"name": "Thrips", "virus_transmitted": "MCMV", "percentage_in_study": "45%"}],
            "treatment": [
                {"priority": "critical", "product": "X"},
                {"priority": "low", "product": "Y"}
            ]
        },
        "MSV": {
            "name": "Maize Streak Virus",
            "description": "Streaks along the leaf veins, spread by leafhoppers",
            "urgency": "high",
            "treatment": [
                {"priority": "medium", "product": "Seed dressing", "type": "chimique"},
                {"priority": "high", "product": "Tolerant variety", "type": "genetique"},
                {"priority": "high", "product": "Early sowing", "type": "cultural"},
                {"product": "Weeding"},
                {"priority": "critical", "product": "Rogueing", "type": "cultural"}
            ]
        }
    },
    "classes": {
        "saine": {"name": "Healthy", "recommendations": ["Keep monitoring"]}
    },
    "legacy_pests": {
        "chenille": {
            "name": "Fall armyworm",
            "scientific_name": "Spodoptera frugiperda",
            "pathogens": [{"full_name": "Spodoptera frugiperda"}]
        }
    }
}"#;

/// Write `contents` as the static database and return its config
fn fixture(contents: &str) -> (StoreConfig, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("diseases_database.json");
    std::fs::write(&path, contents).unwrap();
    (static_config(path), temp_dir)
}

fn static_config(path: PathBuf) -> StoreConfig {
    StoreConfig {
        mongodb_uri: None,
        database_name: "agriguard_test".into(),
        probe_timeout: Duration::from_millis(500),
        static_path: path,
        serve_empty: false,
    }
}

async fn service(config: &StoreConfig) -> DiseaseService {
    let selected = select_store(config).await.unwrap();
    DiseaseService::new(selected.store)
}

#[tokio::test]
async fn test_treatments_priority_order_and_filter() {
    let (config, _temp) = fixture(DATABASE);
    let service = service(&config).await;

    let products: Vec<String> = service
        .get_treatments("MLN", None)
        .await
        .into_iter()
        .map(|t| t.product)
        .collect();
    assert_eq!(products, vec!["X", "Y"]);

    let low = service.get_treatments("MLN", Some("low")).await;
    assert_eq!(low.len(), 1);
    assert_eq!(low[0].product, "Y");

    // An empty filter is no filter
    assert_eq!(service.get_treatments("MLN", Some("")).await.len(), 2);
}

#[tokio::test]
async fn test_unfiltered_treatments_never_invert_priority() {
    let (config, _temp) = fixture(DATABASE);
    let service = service(&config).await;

    let treatments = service.get_treatments("MSV", None).await;
    let ranks: Vec<u8> = treatments.iter().map(|t| t.priority.rank()).collect();
    assert!(ranks.windows(2).all(|w| w[0] <= w[1]), "ranks out of order: {:?}", ranks);

    // Stable: the two high options keep store order, the unset one sorts last
    let products: Vec<&str> = treatments.iter().map(|t| t.product.as_str()).collect();
    assert_eq!(
        products,
        vec!["Rogueing", "Tolerant variety", "Early sowing", "Seed dressing", "Weeding"]
    );
    assert!(!treatments[4].priority.is_specified());
}

#[tokio::test]
async fn test_high_filter_returns_only_high() {
    let (config, _temp) = fixture(DATABASE);
    let service = service(&config).await;

    for id in service.get_all_diseases().await {
        for option in service.get_treatments(&id, Some("high")).await {
            assert_eq!(option.priority, Urgency::High, "{} leaked {:?}", id, option);
        }
    }
    assert_eq!(service.get_treatments("MSV", Some("high")).await.len(), 2);
}

#[tokio::test]
async fn test_store_order_and_type_filter() {
    let (config, _temp) = fixture(DATABASE);
    let service = service(&config).await;

    let in_store_order = service
        .query_treatments("MSV", &TreatmentQuery::default())
        .await;
    assert_eq!(in_store_order[0].product, "Seed dressing");
    assert_eq!(in_store_order.len(), 5);

    let cultural = service
        .query_treatments(
            "MSV",
            &TreatmentQuery {
                kind: Some("cultural".into()),
                ordered: true,
                ..Default::default()
            },
        )
        .await;
    let products: Vec<&str> = cultural.iter().map(|t| t.product.as_str()).collect();
    assert_eq!(products, vec!["Rogueing", "Early sowing"]);
}

#[tokio::test]
async fn test_healthy_class_resolution() {
    let (config, _temp) = fixture(DATABASE);
    let service = service(&config).await;

    let record = service.get_disease_info("saine").await.unwrap();
    assert_eq!(record.category, Category::HealthyState);
    assert_eq!(record.recommendations, vec!["Keep monitoring"]);
    assert!(record.treatment_options.is_empty());
    assert!(record.pathogens.is_empty());
}

#[tokio::test]
async fn test_categories_follow_sections() {
    let (config, _temp) = fixture(DATABASE);
    let service = service(&config).await;

    for (id, expected) in [
        ("MLN", Category::Disease),
        ("MSV", Category::Disease),
        ("saine", Category::HealthyState),
        ("chenille", Category::Pest),
    ] {
        let record = service.get_disease_info(id).await.unwrap();
        assert_eq!(record.category, expected, "{}", id);
    }

    // Pests never carry disease-only fields
    let pest = service.get_disease_info("chenille").await.unwrap();
    assert!(pest.pathogens.is_empty());
    assert_eq!(pest.scientific_name, "Spodoptera frugiperda");
}

#[tokio::test]
async fn test_every_record_has_every_canonical_field() {
    let (config, _temp) = fixture(DATABASE);
    let service = service(&config).await;

    let fields = [
        "id",
        "category",
        "name",
        "scientific_name",
        "description",
        "urgency",
        "symptoms",
        "crops_affected",
        "pathogens",
        "vectors",
        "prevention_measures",
        "treatment_options",
        "impact",
        "geographic_distribution",
        "recommendations",
    ];

    for id in service.get_all_diseases().await {
        let record = service.get_disease_info(&id).await.unwrap();
        let value = serde_json::to_value(&record).unwrap();
        let object = value.as_object().unwrap();
        for field in fields {
            assert!(object.contains_key(field), "{} is missing {}", id, field);
        }
        assert_eq!(object.len(), fields.len());
    }
}

#[tokio::test]
async fn test_missing_urgency_defaults_to_medium() {
    let (config, _temp) = fixture(DATABASE);
    let service = service(&config).await;

    let record = service.get_disease_info("saine").await.unwrap();
    assert_eq!(record.urgency, Urgency::Medium);
}

#[tokio::test]
async fn test_unknown_id_is_none_and_empty() {
    let (config, _temp) = fixture(DATABASE);
    let service = service(&config).await;

    assert!(service.get_disease_info("nonexistent_id").await.is_none());
    assert!(service.get_treatments("nonexistent_id", None).await.is_empty());
    assert!(service.get_vectors("nonexistent_id").await.is_empty());
}

#[tokio::test]
async fn test_lookup_is_idempotent() {
    let (config, _temp) = fixture(DATABASE);
    let service = service(&config).await;

    let first = serde_json::to_vec(&service.get_disease_info("MLN").await).unwrap();
    let second = serde_json::to_vec(&service.get_disease_info("MLN").await).unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_snapshot_matches_id_listing() {
    let (config, _temp) = fixture(DATABASE);
    let service = service(&config).await;

    let ids = service.get_all_diseases().await;
    let snapshot = service.get_database_snapshot().await;
    assert_eq!(snapshot.total, ids.len());
    assert_eq!(snapshot.ids(), ids);
    assert_eq!(snapshot.source, StoreSource::Static);

    let value = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(value["source"], "static");
    assert_eq!(value["total"], 4);
    assert_eq!(value["diseases"]["MLN"]["name"], "Maize Lethal Necrosis");
}

#[tokio::test]
async fn test_malformed_entry_is_skipped_not_fatal() {
    let (config, _temp) = fixture(
        r#"{
            "diseases": {
                "MLN": {"name": "Maize Lethal Necrosis"},
                "broken": {"description": "no name here"}
            }
        }"#,
    );
    let service = service(&config).await;

    assert!(service.get_disease_info("broken").await.is_none());
    assert_eq!(service.get_all_diseases().await, vec!["MLN"]);
    assert_eq!(service.get_database_snapshot().await.total, 1);
}

#[tokio::test]
async fn test_unreachable_document_store_falls_back_to_static() {
    let (mut config, _temp) = fixture(DATABASE);
    config.mongodb_uri = Some("mongodb://127.0.0.1:1".into());
    config.probe_timeout = Duration::from_millis(300);

    let selected = tokio_test::assert_ok!(select_store(&config).await);
    assert!(selected.mongo.is_none());

    let service = DiseaseService::new(selected.store);
    assert_eq!(service.source(), StoreSource::Static);

    let mut ids = service.get_all_diseases().await;
    ids.sort();
    assert_eq!(ids, vec!["MLN", "MSV", "chenille", "saine"]);
    assert_eq!(service.get_database_snapshot().await.source, StoreSource::Static);
}

#[tokio::test]
async fn test_search_and_stats_over_static_file() {
    let (config, _temp) = fixture(DATABASE);
    let service = service(&config).await;

    let found = service.search("streak", None, 20).await;
    assert_eq!(found.total_results, 1);
    assert_eq!(found.results[0].disease_class, "MSV");
    assert_eq!(found.results[0].relevance_score, 15);

    let only_pests = service.search("maize", Some(Category::Pest), 20).await;
    assert_eq!(only_pests.total_results, 0);

    let stats = service.database_stats().await;
    assert_eq!(stats.total_entries, 4);
    let stats = serde_json::to_value(&stats).unwrap();
    assert_eq!(stats["categories"]["disease"], 2);
    assert_eq!(stats["database_source"], "static");
}

#[tokio::test]
async fn test_metadata_from_file() {
    let (config, _temp) = fixture(DATABASE);
    let service = service(&config).await;

    let metadata = service.get_metadata().await;
    assert_eq!(metadata["data_source"], "test fixture");
}
