//! Shared graph fixtures for unit tests

use hopgraph_common::config::{ResolverSettings, SnapshotSettings};
use hopgraph_graph::catalog::CuratedAlias;
use hopgraph_graph::store::{EntityRecord, RelationRecord};
use hopgraph_graph::{EntityCategory, GraphSnapshot, MemoryStore, SnapshotBuilder, SnapshotConfig};
use serde_json::json;
use std::sync::Arc;

pub fn assemble(entities: Vec<EntityRecord>, relations: Vec<RelationRecord>, curated: Vec<CuratedAlias>) -> GraphSnapshot {
    let mut config =
        SnapshotConfig::from_settings(&SnapshotSettings::default(), &ResolverSettings::default()).unwrap();
    config.curated_aliases = curated;
    SnapshotBuilder::new(Arc::new(MemoryStore::default()), config)
        .assemble(entities, relations)
        .unwrap()
}

fn period(mut record: RelationRecord, from: &str, to: Option<&str>) -> RelationRecord {
    record.from_period = Some(from.to_string());
    record.to_period = to.map(str::to_string);
    record
}

/// P1, P2 affiliated with O1; P3 with O2. O1 is based in Q1, O2 in Q2.
/// P2 was born in Q1, P1 in Q2.
pub fn scenario_snapshot() -> GraphSnapshot {
    use EntityCategory::{Organization, Person, Place};

    let entities = vec![
        EntityRecord::new(1, Person, "P1"),
        EntityRecord::new(2, Person, "P2"),
        EntityRecord::new(3, Person, "P3"),
        EntityRecord::new(10, Organization, "O1"),
        EntityRecord::new(11, Organization, "O2"),
        EntityRecord::new(12, Organization, "O3"),
        EntityRecord::new(20, Place, "Q1"),
        EntityRecord::new(21, Place, "Q2"),
    ];
    let relations = vec![
        RelationRecord::new(1, "AFFILIATED_WITH", 10),
        RelationRecord::new(2, "AFFILIATED_WITH", 10),
        RelationRecord::new(3, "AFFILIATED_WITH", 11),
        RelationRecord::new(10, "BASED_IN", 20),
        RelationRecord::new(11, "BASED_IN", 21),
        RelationRecord::new(2, "BORN_IN", 20),
        RelationRecord::new(1, "BORN_IN", 21),
    ];
    assemble(entities, relations, Vec::new())
}

/// A small slice of Vietnamese football
pub fn football_snapshot() -> GraphSnapshot {
    use EntityCategory::{Competition, Organization, Person, Place, Venue};

    let mut v_league_1 = EntityRecord::new(31, Competition, "V.League 1");
    v_league_1.properties = Some(json!({ "tier": 1 }));
    let mut v_league_2 = EntityRecord::new(32, Competition, "V.League 2");
    v_league_2.properties = Some(json!({ "tier": 2 }));

    let entities = vec![
        EntityRecord::new(1, Person, "Nguyễn Quang Hải"),
        EntityRecord::new(2, Person, "Nguyễn Công Phượng"),
        EntityRecord::new(3, Person, "Đoàn Văn Hậu"),
        EntityRecord::new(4, Person, "Nguyễn Văn Toàn"),
        EntityRecord::new(5, Person, "Park Hang-seo"),
        EntityRecord::new(10, Organization, "Hà Nội FC"),
        EntityRecord::new(11, Organization, "Hoàng Anh Gia Lai"),
        EntityRecord::new(12, Organization, "Sông Lam Nghệ An"),
        EntityRecord::new(13, Organization, "Câu lạc bộ bóng đá Viettel"),
        EntityRecord::new(14, Organization, "Đội tuyển quốc gia Việt Nam"),
        EntityRecord::new(20, Place, "Hà Nội"),
        EntityRecord::new(21, Place, "Nghệ An"),
        EntityRecord::new(22, Place, "Thái Bình"),
        EntityRecord::new(23, Place, "Gia Lai"),
        EntityRecord::new(24, Place, "Hải Dương"),
        EntityRecord::new(30, Venue, "Sân vận động Hàng Đẫy"),
        v_league_1,
        v_league_2,
    ];

    let relations = vec![
        period(RelationRecord::new(1, "AFFILIATED_WITH", 10), "2016", None),
        period(RelationRecord::new(3, "AFFILIATED_WITH", 10), "2017", None),
        period(RelationRecord::new(2, "AFFILIATED_WITH", 11), "2015", Some("2019")),
        period(RelationRecord::new(2, "AFFILIATED_WITH", 12), "2020", Some("2021")),
        RelationRecord::new(4, "AFFILIATED_WITH", 11),
        RelationRecord::new(1, "BORN_IN", 20),
        RelationRecord::new(2, "BORN_IN", 21),
        RelationRecord::new(3, "BORN_IN", 22),
        RelationRecord::new(4, "BORN_IN", 24),
        RelationRecord::new(10, "BASED_IN", 20),
        RelationRecord::new(11, "BASED_IN", 23),
        RelationRecord::new(12, "BASED_IN", 21),
        RelationRecord::new(13, "BASED_IN", 20),
        RelationRecord::new(10, "HOME_VENUE", 30),
        RelationRecord::new(10, "COMPETES_IN", 31),
        RelationRecord::new(11, "COMPETES_IN", 31),
        RelationRecord::new(12, "COMPETES_IN", 32),
        RelationRecord::new(1, "TEAMMATE", 3),
        RelationRecord::new(5, "COACHED", 14),
        RelationRecord::new(1, "REPRESENTED", 14),
        RelationRecord::new(2, "REPRESENTED", 14),
        RelationRecord::new(3, "REPRESENTED", 14),
        RelationRecord::new(4, "REPRESENTED", 14),
    ];

    let curated = vec![
        CuratedAlias::new("Hà Nội", "Hà Nội FC"),
        CuratedAlias::new("HAGL", "Hoàng Anh Gia Lai"),
        CuratedAlias::new("SLNA", "Sông Lam Nghệ An"),
        CuratedAlias::new("Việt Nam", "Đội tuyển quốc gia Việt Nam"),
        CuratedAlias::new("Hàng Đẫy", "Sân vận động Hàng Đẫy"),
    ];

    assemble(entities, relations, curated)
}
