use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(column_type = "String(StringLen::N(100))")]
    pub shimei: String,
    #[sea_orm(column_type = "String(StringLen::N(100))")]
    pub shimei_kana: String,
    #[sea_orm(column_type = "String(StringLen::N(254))")]
    pub email: String,
    /// `M` or `F`
    #[sea_orm(column_type = "String(StringLen::N(1))")]
    pub sex: String,
    pub birthdate: Date,
    pub is_married: bool,
    #[sea_orm(column_type = "String(StringLen::N(2))")]
    pub blood_type: String,
    pub prefecture_id: i64,
    #[sea_orm(column_type = "String(StringLen::N(12))")]
    pub tel: String,
    #[sea_orm(column_type = "String(StringLen::N(12))")]
    pub mobile: String,
    pub carrier_id: Option<i64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::prefecture::Entity",
        from = "Column::PrefectureId",
        to = "super::prefecture::Column::Id",
        on_delete = "Cascade"
    )]
    Prefecture,
    #[sea_orm(
        belongs_to = "super::carrier::Entity",
        from = "Column::CarrierId",
        to = "super::carrier::Column::Id",
        on_delete = "SetNull"
    )]
    Carrier,
}

impl Related<super::prefecture::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Prefecture.def()
    }
}

impl Related<super::carrier::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Carrier.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
