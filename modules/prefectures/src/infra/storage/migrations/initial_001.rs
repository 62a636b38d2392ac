use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Prefectures::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Prefectures::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Prefectures::Name)
                            .string_len(5)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Prefectures::Capital).string_len(50).not_null())
                    .col(
                        ColumnDef::new(Prefectures::IsOd)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Prefectures::Population).integer().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Carriers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Carriers::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Carriers::Name)
                            .string_len(20)
                            .not_null()
                            .unique_key(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Users::Shimei).string_len(100).not_null())
                    .col(ColumnDef::new(Users::ShimeiKana).string_len(100).not_null())
                    .col(
                        ColumnDef::new(Users::Email)
                            .string_len(254)
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(Users::Sex).string_len(1).not_null())
                    .col(ColumnDef::new(Users::Birthdate).date().not_null())
                    .col(
                        ColumnDef::new(Users::IsMarried)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Users::BloodType).string_len(2).not_null())
                    .col(ColumnDef::new(Users::PrefectureId).big_integer().not_null())
                    .col(ColumnDef::new(Users::Tel).string_len(12).not_null().default(""))
                    .col(ColumnDef::new(Users::Mobile).string_len(12).not_null().default(""))
                    .col(ColumnDef::new(Users::CarrierId).big_integer().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_users_prefecture")
                            .from(Users::Table, Users::PrefectureId)
                            .to(Prefectures::Table, Prefectures::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_users_carrier")
                            .from(Users::Table, Users::CarrierId)
                            .to(Carriers::Table, Carriers::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_users_prefecture_id")
                    .table(Users::Table)
                    .col(Users::PrefectureId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Carriers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Prefectures::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Prefectures {
    Table,
    Id,
    Name,
    Capital,
    IsOd,
    Population,
}

#[derive(DeriveIden)]
enum Carriers {
    Table,
    Id,
    Name,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Shimei,
    ShimeiKana,
    Email,
    Sex,
    Birthdate,
    IsMarried,
    BloodType,
    PrefectureId,
    Tel,
    Mobile,
    CarrierId,
}
