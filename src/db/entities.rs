#[allow(unused_imports)]
pub mod prelude {
    pub use super::board::Entity as Board;
    pub use super::board_column::Entity as BoardColumn;
    pub use super::card::Entity as Card;
    pub use super::label::Entity as Label;
}

pub mod board {
    use sea_orm::entity::prelude::*;

    #[sea_orm::model]
    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "boards")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        pub name: String,
        #[sea_orm(default_expr = "Expr::current_timestamp()")]
        pub created_at: DateTimeWithTimeZone,
        #[sea_orm(default_expr = "Expr::current_timestamp()")]
        pub updated_at: DateTimeWithTimeZone,
        #[sea_orm(has_many)]
        pub columns: HasMany<super::board_column::Entity>,
        #[sea_orm(has_many)]
        pub cards: HasMany<super::card::Entity>,
        #[sea_orm(has_many)]
        pub labels: HasMany<super::label::Entity>,
    }

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod board_column {
    use sea_orm::entity::prelude::*;

    #[sea_orm::model]
    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "columns")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        #[sea_orm(indexed)]
        pub board_id: Uuid,
        pub name: String,
        /// Dense zero-based rank within the board, left to right.
        pub position: i32,
        #[sea_orm(default_value = "#6B7280")]
        pub color: String,
        #[sea_orm(belongs_to, from = "board_id", to = "id", on_delete = "Cascade")]
        pub board: HasOne<super::board::Entity>,
        #[sea_orm(has_many)]
        pub cards: HasMany<super::card::Entity>,
    }

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod card {
    use sea_orm::entity::prelude::*;

    #[sea_orm::model]
    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "cards")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        #[sea_orm(indexed)]
        pub board_id: Uuid,
        #[sea_orm(indexed)]
        pub column_id: Uuid,
        pub title: String,
        pub description: Option<String>,
        /// Dense zero-based rank within the column, top to bottom.
        pub position: i32,
        #[sea_orm(default_value = "none")]
        pub priority: String,
        /// JSON list of label snapshots ({name, color} pairs).
        pub labels: Json,
        #[sea_orm(default_expr = "Expr::current_timestamp()")]
        pub created_at: DateTimeWithTimeZone,
        #[sea_orm(default_expr = "Expr::current_timestamp()")]
        pub updated_at: DateTimeWithTimeZone,
        #[sea_orm(belongs_to, from = "board_id", to = "id", on_delete = "Cascade")]
        pub board: HasOne<super::board::Entity>,
        #[sea_orm(belongs_to, from = "column_id", to = "id", on_delete = "Cascade")]
        pub column: HasOne<super::board_column::Entity>,
    }

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod label {
    use sea_orm::entity::prelude::*;

    #[sea_orm::model]
    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "labels")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        #[sea_orm(indexed)]
        pub board_id: Uuid,
        pub name: String,
        pub color: String,
        #[sea_orm(belongs_to, from = "board_id", to = "id", on_delete = "Cascade")]
        pub board: HasOne<super::board::Entity>,
    }

    impl ActiveModelBehavior for ActiveModel {}
}
