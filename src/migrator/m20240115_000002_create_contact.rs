use sea_orm_migration::prelude::*;

use super::m20240115_000001_create_account::User;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        file!()
    }
}

#[rustfmt::skip]
#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Category::Table)
                    .col(
                        ColumnDef::new(Category::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Category::Name).string().not_null().unique_key())
                    .clone(),
            )
            .await?;
        manager
            .create_table(
                Table::create()
                    .table(Contact::Table)
                    .col(
                        ColumnDef::new(Contact::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-contact-category")
                            .from(Contact::Table, Contact::CategoryId)
                            .to(Category::Table, Category::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-contact-owner")
                            .from(Contact::Table, Contact::OwnerId)
                            .to(User::Table, User::Id),
                    )
                    .col(ColumnDef::new(Contact::FirstName).string().not_null())
                    .col(ColumnDef::new(Contact::LastName).string().not_null())
                    .col(ColumnDef::new(Contact::Phone).string().not_null())
                    .col(ColumnDef::new(Contact::Email).string().not_null())
                    .col(ColumnDef::new(Contact::Description).string().not_null())
                    .col(ColumnDef::new(Contact::CategoryId).integer().not_null())
                    .col(ColumnDef::new(Contact::Picture).string())
                    .col(ColumnDef::new(Contact::Show).boolean().not_null())
                    .col(ColumnDef::new(Contact::OwnerId).integer().not_null())
                    .clone(),
            )
            .await?;

        let starter_categories = Query::insert()
            .into_table(Category::Table)
            .columns([Category::Name])
            .values_panic(["Family".into()])
            .values_panic(["Friends".into()])
            .values_panic(["Work".into()])
            .to_owned();
        manager.exec_stmt(starter_categories).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Contact::Table).clone())
            .await?;
        manager
            .drop_table(Table::drop().table(Category::Table).clone())
            .await
    }
}

#[derive(Iden)]
pub enum Category {
    Table,
    Id,
    Name,
}

#[derive(Iden)]
pub enum Contact {
    Table,
    Id,
    FirstName,
    LastName,
    Phone,
    Email,
    Description,
    CategoryId,
    Picture,
    Show,
    OwnerId,
}
