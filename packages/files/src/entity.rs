//! [`FileRecord`] for SeaORM active models.

use async_trait::async_trait;
use sea_orm::sea_query::ValueType;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, ColumnType, DatabaseConnection,
    EntityTrait, IntoActiveModel, Value,
};

use crate::record::{FileRecord, RecordError};

type ColumnOf<A> = <<A as ActiveModelTrait>::Entity as EntityTrait>::Column;

/// An active model whose `column` holds the files JSON.
///
/// Both text and JSON columns work.
#[derive(Debug)]
pub struct EntityRecord<A: ActiveModelTrait> {
    model: A,
    column: ColumnOf<A>,
    db: DatabaseConnection,
}

impl<A: ActiveModelTrait> EntityRecord<A> {
    pub fn new(model: A, column: ColumnOf<A>, db: DatabaseConnection) -> Self {
        Self { model, column, db }
    }

    pub fn model(&self) -> &A {
        &self.model
    }

    pub fn into_model(self) -> A {
        self.model
    }

    fn is_json_column(&self) -> bool {
        matches!(
            self.column.def().get_column_type(),
            ColumnType::Json | ColumnType::JsonBinary
        )
    }
}

#[async_trait]
impl<A> FileRecord for EntityRecord<A>
where
    A: ActiveModelTrait + ActiveModelBehavior + Send + Sync + 'static,
    <A::Entity as EntityTrait>::Model: IntoActiveModel<A>,
    ColumnOf<A>: Send + Sync,
{
    fn files_json(&self) -> Option<String> {
        match self.model.get(self.column).into_value()? {
            Value::Json(json) => json.map(|json| json.to_string()),
            other => <Option<String> as ValueType>::try_from(other).ok().flatten(),
        }
    }

    fn set_files_json(&mut self, value: Option<String>) {
        let value = if self.is_json_column() {
            Value::from(value.and_then(|raw| serde_json::from_str::<serde_json::Value>(&raw).ok()))
        } else {
            Value::from(value)
        };
        self.model.set(self.column, value);
    }

    async fn save(&mut self) -> Result<(), RecordError> {
        self.model = self.model.clone().save(&self.db).await?;
        Ok(())
    }
}
