use super::*;
use shared::error::ErrorKind;

#[test]
fn default_menu_lists_categories_in_order() {
    let catalog = Catalog::default_menu();
    let names: Vec<_> = catalog.categories().iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["Drinks", "Foods"]);

    let drinks = catalog.list_category("Drinks").expect("drinks");
    assert_eq!(drinks[2].name, "Cola");
    assert_eq!(drinks[2].price, 3);
}

#[test]
fn lookup_ignores_case() {
    let catalog = Catalog::default_menu();
    assert_eq!(catalog.category("drinks").expect("drinks").name, "Drinks");
    assert_eq!(catalog.get_item("FOODS", 4).expect("fries").name, "Fries");
}

#[test]
fn unknown_category_and_index_are_sequencing_errors() {
    let catalog = Catalog::default_menu();

    let err = catalog.list_category("Desserts").expect_err("unknown");
    assert_eq!(err, OrderingError::UnknownCategory("Desserts".into()));
    assert_eq!(err.kind(), ErrorKind::Sequencing);

    let err = catalog.get_item("Drinks", 3).expect_err("out of range");
    assert!(matches!(err, OrderingError::IndexOutOfRange { index: 3, .. }));
}

#[test]
fn resolve_returns_canonical_reference() {
    let catalog = Catalog::default_menu();
    let (item_ref, item) = catalog.resolve(&ItemRef::new("drinks", 2)).expect("resolve");
    assert_eq!(item_ref, ItemRef::new("Drinks", 2));
    assert_eq!(item.name, "Cola");
}

#[test]
fn parses_toml_catalog() {
    let raw = r#"
        [[category]]
        name = "Coffee"

        [[category.items]]
        name = "Espresso"
        price = 4
        description = "Short and strong."
        image = "espresso.jpg"

        [[category.items]]
        name = "Latte"
        price = 6
        description = "Milky."
    "#;

    let catalog = Catalog::from_toml_str(raw).expect("catalog");
    let coffee = catalog.list_category("coffee").expect("coffee");
    assert_eq!(coffee.len(), 2);
    assert_eq!(coffee[0].image.as_deref(), Some("espresso.jpg"));
    assert_eq!(coffee[1].image, None);
}

#[test]
fn rejects_zero_prices_and_duplicate_categories() {
    let zero_price = r#"
        [[category]]
        name = "Coffee"
        [[category.items]]
        name = "Free refill"
        price = 0
        description = ""
    "#;
    let err = Catalog::from_toml_str(zero_price).expect_err("zero price");
    assert!(err.to_string().contains("positive price"), "{err}");

    let duplicate = r#"
        [[category]]
        name = "Coffee"
        [[category]]
        name = "coffee"
    "#;
    let err = Catalog::from_toml_str(duplicate).expect_err("duplicate");
    assert!(err.to_string().contains("duplicate category"), "{err}");

    assert!(Catalog::new(Vec::new()).is_err());
}

#[test]
fn load_reads_file_from_disk() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("menu.toml");
    std::fs::write(
        &path,
        "[[category]]\nname = \"Snacks\"\n[[category.items]]\nname = \"Chips\"\nprice = 2\ndescription = \"Salted.\"\n",
    )
    .expect("write");

    let catalog = Catalog::load(&path).expect("load");
    assert_eq!(catalog.get_item("Snacks", 0).expect("chips").name, "Chips");

    let err = Catalog::load(dir.path().join("missing.toml")).expect_err("missing");
    assert!(format!("{err:#}").contains("failed to read catalog"));
}

fn single_item_category(name: &str, items: usize) -> Category {
    Category {
        name: name.to_string(),
        items: (0..items)
            .map(|i| Item {
                name: format!("Item {i}"),
                price: 1,
                description: String::new(),
                image: None,
            })
            .collect(),
    }
}

#[test]
fn menu_button_data_finds_non_ascii_category() {
    let catalog = Catalog::new(vec![single_item_category("Ética", 1)]).expect("catalog");

    let data = CallbackAction::OpenCategory("Ética".into()).to_data();
    let CallbackAction::OpenCategory(name) = CallbackAction::parse(&data).expect("parse") else {
        panic!("unexpected action for {data}");
    };
    assert_eq!(catalog.category(&name).expect("lookup").name, "Ética");
    assert_eq!(catalog.category("ÉTICA").expect("upper").name, "Ética");
}

#[test]
fn rejects_categories_whose_button_data_is_too_long() {
    let long_name = "A".repeat(60);
    let err = Catalog::new(vec![single_item_category(&long_name, 1)]).expect_err("menu data");
    assert!(err.to_string().contains("too long for button data"), "{err}");

    // Fits on its own, but the toggle data for item index 100 does not.
    let name = "B".repeat(54);
    assert!(Catalog::new(vec![single_item_category(&name, 10)]).is_ok());
    let err = Catalog::new(vec![single_item_category(&name, 101)]).expect_err("toggle data");
    assert!(err.to_string().contains("too long for button data"), "{err}");
}
