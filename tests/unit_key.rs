use ferrous_services::{
    key_of_type, Capabilities, Construct, Definition, DefinitionKey, Destroy, ServiceContext,
    ServiceResult, TypeVariant,
};
use std::collections::HashSet;

#[derive(Default)]
struct Alpha;
#[derive(Default)]
struct Beta;

impl Construct for Alpha {
    fn construct(_: &ServiceContext<'_>) -> ServiceResult<Self> {
        Ok(Alpha)
    }
}

impl Destroy for Alpha {
    fn destroy(&self) {}
}

#[test]
fn test_type_keys_follow_the_type() {
    assert_eq!(key_of_type::<Alpha>(), key_of_type::<Alpha>());
    assert_ne!(key_of_type::<Alpha>(), key_of_type::<Beta>());
    assert_eq!(Definition::<Alpha>::of().key(), key_of_type::<Alpha>());
    assert!(key_of_type::<Alpha>().display_name().ends_with("Alpha"));
}

#[test]
fn test_object_keys_are_unique() {
    let keys: HashSet<DefinitionKey> = (0..100).map(|_| DefinitionKey::object("same")).collect();
    assert_eq!(keys.len(), 100);
}

#[test]
fn test_names_do_not_affect_identity() {
    let key = DefinitionKey::object("first");
    let renamed = match key {
        DefinitionKey::Object(id, _) => DefinitionKey::Object(id, "second"),
        other => other,
    };
    assert_eq!(renamed.display_name(), "second");
    assert_eq!(key, renamed);

    let mut set = HashSet::new();
    set.insert(key);
    assert!(set.contains(&renamed));
}

#[test]
fn test_type_and_object_keys_never_collide() {
    let definition = Definition::from_fn("Alpha", |_| Ok(Alpha));
    assert_ne!(definition.key(), key_of_type::<Alpha>());
}

#[test]
fn test_capabilities_reflect_the_constructor() {
    let plain = Definition::<Alpha>::of();
    assert_eq!(plain.capabilities(), Capabilities::CONSTRUCTIBLE);
    assert!(!plain.info().is_resource());

    let pooled = Definition::resource("pool", |_| Ok(Beta));
    assert!(pooled.info().is_resource());
    assert!(pooled.info().is_constructible());
    assert!(!pooled.info().has_teardown());
    assert_eq!(pooled.name(), "pool");
}

#[test]
fn test_build_variants_have_their_own_identity() {
    let plain = Definition::<Alpha>::of().key();
    let constructed = Definition::<Alpha>::constructed().key();
    let destroyable = Definition::<Alpha>::of().destroyable().key();

    assert_ne!(plain, constructed);
    assert_ne!(plain, destroyable);
    assert_ne!(constructed, Definition::<Alpha>::constructed().destroyable().key());
    assert_eq!(destroyable, Definition::<Alpha>::of().destroyable().key());
    assert_eq!(
        destroyable,
        key_of_type::<Alpha>().with_variant(TypeVariant::DESTROY)
    );
}

#[test]
fn test_teardown_on_closure_definitions_splits_identity() {
    let base = Definition::from_fn("alpha", |_| Ok(Alpha));
    let hooked = base.clone().destroyable();

    assert_ne!(base.key(), hooked.key());
    assert_eq!(hooked.key(), hooked.clone().destroyable().key());
    assert_eq!(hooked.name(), "alpha");
}
