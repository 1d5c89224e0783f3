use wpi_sim::{
    classify,
    geo::{catalog::POPULATION_HUBS, Catalog},
    Classification, Coordinate, Habitability, SimError,
};

#[test]
fn classification_is_deterministic() {
    for lat in (-80..=80).step_by(7) {
        for lon in (-175..=175).step_by(11) {
            let first = classify(lat as f64, lon as f64).unwrap();
            let second = classify(lat as f64, lon as f64).unwrap();
            assert_eq!(first, second, "({lat}, {lon})");
        }
    }
}

#[test]
fn water_never_has_people() {
    for lat in (-88..=88).step_by(4) {
        for lon in (-178..=178).step_by(6) {
            let geo = classify(lat as f64, lon as f64).unwrap();
            if geo.is_water {
                assert_eq!(geo.population, 0, "({lat}, {lon})");
                assert_eq!(geo.habitability, Habitability::Uninhabited);
            } else {
                assert!(geo.population > 0, "({lat}, {lon})");
            }
        }
    }
}

#[test]
fn every_hub_centre_is_a_city() {
    for hub in POPULATION_HUBS.iter() {
        let geo = classify(hub.lat, hub.lon).unwrap();
        assert_eq!(geo.biome, "Urban Center", "{}", hub.name);
        assert!(geo.population as f64 >= hub.base_population_m * 1_000_000.0 - 1.0);
        assert!(matches!(
            geo.classification,
            Classification::Urban | Classification::Metro | Classification::Megacity
        ));
    }
}

#[test]
fn hubs_win_over_exclusion_zones() {
    // Mumbai sits inside the Arabian Sea box.
    let mumbai = classify(19.07, 72.87).unwrap();
    assert_eq!(mumbai.classification, Classification::Megacity);
    assert_eq!(mumbai.population, 20_000_000);
    assert_eq!(
        mumbai.explanation,
        vec!["Major Urban Hub detected.", "Population: 20,000,000"]
    );
}

#[test]
fn zones_and_open_water() {
    let sahara = classify(23.0, 10.0).unwrap();
    assert_eq!(sahara.classification, Classification::Uninhabited);
    assert_eq!(sahara.biome, "Sahara Desert");

    let pacific = classify(0.0, -150.0).unwrap();
    assert_eq!(pacific.classification, Classification::Ocean);
    assert_eq!(pacific.biome, "Deep Ocean");
}

#[test]
fn rural_population_stays_in_band() {
    for (lat, lon) in [(45.0, -100.0), (50.0, 20.0), (-15.0, 25.0), (-10.0, -55.0)] {
        let geo = classify(lat, lon).unwrap();
        assert_eq!(geo.biome, "Rural Settlement", "({lat}, {lon})");
        assert!((2_000..22_000).contains(&geo.population), "{}", geo.population);
    }
}

#[test]
fn out_of_range_coordinates_are_rejected() {
    assert_eq!(
        classify(91.0, 0.0),
        Err(SimError::InvalidCoordinate { lat: 91.0, lon: 0.0 })
    );
    assert!(classify(0.0, -180.5).is_err());
    assert!(classify(f64::NAN, 0.0).is_err());
    assert!(Coordinate::new(-90.0, 180.0).is_ok());
}

#[test]
fn empty_catalog_classifies_everything_as_ocean() {
    let catalog = Catalog {
        hubs: &[],
        exclusion_zones: &[],
        land_boxes: &[],
    };
    let geo = catalog.classify(Coordinate::new(19.07, 72.87).unwrap());
    assert_eq!(geo.classification, Classification::Ocean);
}
