use anyhow::Context;
use sea_orm::{
    ActiveValue::Set, DatabaseConnection, EntityTrait, PaginatorTrait, TransactionTrait,
};
use tracing::{debug, info};

use super::entity::{carrier, prefecture, user};
use crate::dataset;

/// Load the bundled dataset into empty tables. Tables that already hold
/// prefectures are left alone.
pub async fn seed(db: &DatabaseConnection) -> anyhow::Result<()> {
    let existing = prefecture::Entity::find().count(db).await?;
    if existing > 0 {
        debug!(existing, "prefectures already seeded");
        return Ok(());
    }

    let prefectures = dataset::prefectures()?;
    let carriers = dataset::carriers()?;
    let users = dataset::users()?;
    let counts = (prefectures.len(), carriers.len(), users.len());

    let txn = db.begin().await?;
    prefecture::Entity::insert_many(prefectures.into_iter().map(|p| prefecture::ActiveModel {
        id: Set(p.id),
        name: Set(p.name),
        capital: Set(p.capital),
        is_od: Set(p.is_od),
        population: Set(p.population),
    }))
    .exec(&txn)
    .await
    .context("seeding prefectures")?;

    carrier::Entity::insert_many(carriers.into_iter().map(|c| carrier::ActiveModel {
        id: Set(c.id),
        name: Set(c.name),
    }))
    .exec(&txn)
    .await
    .context("seeding carriers")?;

    user::Entity::insert_many(users.into_iter().map(|u| user::ActiveModel {
        id: Set(u.id),
        shimei: Set(u.shimei),
        shimei_kana: Set(u.shimei_kana),
        email: Set(u.email),
        sex: Set(u.sex),
        birthdate: Set(u.birthdate),
        is_married: Set(u.is_married),
        blood_type: Set(u.blood_type),
        prefecture_id: Set(u.prefecture),
        tel: Set(u.tel),
        mobile: Set(u.mobile),
        carrier_id: Set(u.carrier),
    }))
    .exec(&txn)
    .await
    .context("seeding users")?;
    txn.commit().await?;

    info!(
        prefectures = counts.0,
        carriers = counts.1,
        users = counts.2,
        "dataset seeded"
    );
    Ok(())
}
