//! Fixtures shared by the [`Service`] tests.

use std::time::Duration;

use common::{operations::Insert, DateTime};
use rust_decimal::Decimal;

use crate::{
    domain::{appointment, shop, treatment, user, Shop, Treatment, User},
    infra::{database::Memory, Database as _},
    task, Config, Service,
};

/// Creates a new [`Service`] on top of the provided [`Memory`] database.
pub(crate) fn service(db: Memory) -> Service<Memory> {
    Service::without_tasks(
        Config {
            session_lifetime: Duration::from_secs(24 * 60 * 60),
            clean_expired_sessions: task::clean_expired_sessions::Config {
                interval: Duration::from_secs(60),
            },
        },
        db,
    )
}

/// Password every [`user()`] is created with.
pub(crate) const PASSWORD: &str = "secret-password";

/// Stores a new [`User`] with the provided [`user::Role`].
pub(crate) async fn user(db: &Memory, role: user::Role) -> User {
    let id = user::Id::new();
    let user = User {
        id,
        name: user::Name::new(format!("{role} {id}")).unwrap(),
        email: user::Email::new(format!("{id}@example.com")).unwrap(),
        password_hash: user::PasswordHash::new(
            &user::Password::new(PASSWORD).unwrap(),
        )
        .unwrap(),
        phone: None,
        role,
        shop_id: None,
        specialties: vec![],
        created_at: DateTime::now().coerce(),
        deleted_at: None,
    };
    db.execute(Insert(user.clone())).await.unwrap();
    user
}

/// Stores a new [`Shop`] owned by the provided [`User`].
pub(crate) async fn shop(db: &Memory, owner: &User) -> Shop {
    let shop = Shop {
        id: shop::Id::new(),
        name: shop::Name::new("Sharp Cuts").unwrap(),
        address: shop::Address::new("1 Main St").unwrap(),
        city: shop::City::new("Springfield").unwrap(),
        phone: None,
        owner_id: owner.id,
        schedule: None,
        created_at: DateTime::now().coerce(),
    };
    db.execute(Insert(shop.clone())).await.unwrap();
    shop
}

/// Stores a new [`Treatment`] of the provided [`Shop`] lasting the given
/// amount of minutes.
pub(crate) async fn treatment(
    db: &Memory,
    shop: &Shop,
    minutes: Option<u16>,
) -> Treatment {
    let treatment = Treatment {
        id: treatment::Id::new(),
        name: treatment::Name::new("Haircut").unwrap(),
        description: None,
        price: treatment::Price::new(Decimal::new(2500, 2)).unwrap(),
        duration: minutes.map(|m| appointment::Duration::from_minutes(m).unwrap()),
        owner: treatment::Owner::Shop(shop.id),
        created_at: DateTime::now().coerce(),
    };
    db.execute(Insert(treatment.clone())).await.unwrap();
    treatment
}

/// Parses an [`appointment::Slot`] start.
pub(crate) fn at(date: &str, time: &str) -> (common::Date, common::Time) {
    (date.parse().unwrap(), time.parse().unwrap())
}
