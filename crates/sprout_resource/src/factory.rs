//! Resource factory: address string to [`Resource`].

use crate::error::FactoryError;
use crate::file::FileResource;
use crate::locator::{self, FILE_SCHEME, GCS_SCHEME, Locator};
use crate::object_store::{ObjectStoreResource, SharedObjectStore};
use crate::resource::Resource;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Builds a resource for one scheme.
///
/// Register custom builders with [`ResourceFactory::register`] to make new
/// resource kinds reachable from address strings.
#[async_trait]
pub trait ResourceBuilder: Send + Sync + 'static {
    /// Builds a resource from a resolved locator.
    ///
    /// # Errors
    ///
    /// Returns [`FactoryError`] if the locator is not valid for this kind.
    async fn build(&self, locator: &Locator) -> Result<Box<dyn Resource>, FactoryError>;
}

struct FileBuilder;

#[async_trait]
impl ResourceBuilder for FileBuilder {
    async fn build(&self, locator: &Locator) -> Result<Box<dyn Resource>, FactoryError> {
        Ok(Box::new(FileResource::new(locator.remainder()).await?))
    }
}

struct ObjectStoreBuilder {
    store: SharedObjectStore,
}

#[async_trait]
impl ResourceBuilder for ObjectStoreBuilder {
    async fn build(&self, locator: &Locator) -> Result<Box<dyn Resource>, FactoryError> {
        Ok(Box::new(ObjectStoreResource::from_path(
            self.store.clone(),
            locator.remainder(),
        )?))
    }
}

/// Registry mapping scheme tags to resource builders.
///
/// The standard registry knows three tags:
///
/// | Scheme | Resource |
/// |--------|----------|
/// | `file` | [`FileResource`] rooted at the remainder |
/// | *(none)* | [`FileResource`] rooted at the remainder |
/// | `gs` | [`ObjectStoreResource`] for `bucket[/prefix]` |
///
/// Network schemes are deliberately absent; see [`NetResource`](crate::net::NetResource).
///
/// ```no_run
/// # async fn demo() -> Result<(), sprout_resource::FactoryError> {
/// use sprout_resource::ResourceFactory;
///
/// let factory = ResourceFactory::default();
/// let config = factory.create("./config.json").await?;
/// let bucket = factory.create("gs://my-bucket/config.json").await?;
/// # Ok(())
/// # }
/// ```
pub struct ResourceFactory {
    // Maps scheme tags to builders.
    builders: HashMap<String, Arc<dyn ResourceBuilder>>,
}

impl core::fmt::Debug for ResourceFactory {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ResourceFactory")
            .field("schemes", &self.schemes())
            .finish()
    }
}

impl Default for ResourceFactory {
    /// Standard registry with an object store client configured from the
    /// environment, created on first use.
    fn default() -> Self {
        Self::standard(SharedObjectStore::from_env())
    }
}

impl ResourceFactory {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            builders: HashMap::new(),
        }
    }

    /// Creates the standard registry, using `store` for object store resources.
    #[must_use]
    pub fn standard(store: SharedObjectStore) -> Self {
        let mut factory = Self::new();
        let file: Arc<dyn ResourceBuilder> = Arc::new(FileBuilder);
        factory.builders.insert(FILE_SCHEME.to_string(), file.clone());
        factory.builders.insert(String::new(), file);
        factory.register(GCS_SCHEME, Arc::new(ObjectStoreBuilder { store }));
        factory
    }

    /// Registers a builder for `scheme`.
    ///
    /// # Panics
    ///
    /// Panics if a builder for the same scheme is already registered.
    pub fn register<B: ResourceBuilder>(&mut self, scheme: impl Into<String>, builder: Arc<B>) {
        let scheme = scheme.into();
        assert!(
            !self.builders.contains_key(&scheme),
            "resource scheme '{scheme}' is already registered"
        );
        self.builders
            .insert(scheme, builder as Arc<dyn ResourceBuilder>);
    }

    /// Checks if a scheme is registered.
    #[must_use]
    pub fn has_scheme(&self, scheme: impl AsRef<str>) -> bool {
        self.builders.contains_key(scheme.as_ref())
    }

    /// Lists registered schemes, sorted.
    #[must_use]
    pub fn schemes(&self) -> Vec<String> {
        let mut schemes: Vec<String> = self.builders.keys().cloned().collect();
        schemes.sort();
        schemes
    }

    /// Resolves `address` and builds the matching resource.
    ///
    /// # Errors
    ///
    /// - [`FactoryError::Locator`] if the address cannot be resolved
    /// - [`FactoryError::UnknownResourceType`] if no builder handles the scheme
    /// - any error raised by the builder (e.g. the file cannot be inspected)
    pub async fn create(&self, address: impl AsRef<str>) -> Result<Box<dyn Resource>, FactoryError> {
        let locator = locator::resolve(address.as_ref())?;

        let builder = self
            .builders
            .get(locator.scheme())
            .ok_or_else(|| FactoryError::UnknownResourceType(locator.scheme().to_string()))?;

        let resource = builder.build(&locator).await?;
        tracing::debug!(
            scheme = locator.scheme(),
            resource = %resource.describe(),
            "created resource"
        );
        Ok(resource)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LocatorError;
    use crate::net::NetResource;
    use crate::testing::FakeObjectStore;
    use std::io::Write;

    fn factory() -> ResourceFactory {
        ResourceFactory::standard(SharedObjectStore::new(Arc::new(FakeObjectStore::new())))
    }

    #[test]
    fn standard_schemes() {
        assert_eq!(factory().schemes(), vec!["", "file", "gs"]);
        assert!(ResourceFactory::new().schemes().is_empty());
    }

    #[tokio::test]
    async fn path_address_builds_file_resource() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"x").unwrap();

        let resource = factory().create(file.path().to_str().unwrap()).await.unwrap();
        assert_eq!(
            resource.describe(),
            format!("file://{}", file.path().display())
        );
    }

    #[tokio::test]
    async fn gs_address_builds_object_resource() {
        let resource = factory().create("gs://bucket/dir/obj").await.unwrap();
        assert_eq!(resource.describe(), "gs://bucket/dir/obj");
    }

    #[tokio::test]
    async fn unknown_scheme_is_rejected() {
        let err = factory().create("http://example.com").await.unwrap_err();
        assert!(matches!(err, FactoryError::UnknownResourceType(scheme) if scheme == "http"));
    }

    #[tokio::test]
    async fn missing_scheme_is_rejected() {
        let err = factory().create(":oops").await.unwrap_err();
        assert!(matches!(
            err,
            FactoryError::Locator(LocatorError::MissingScheme(_))
        ));
    }

    #[tokio::test]
    async fn missing_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let address = dir.path().join("absent.json");
        let err = factory()
            .create(address.to_str().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, FactoryError::Stat { .. }));
    }

    #[tokio::test]
    async fn custom_builder_is_dispatched() {
        struct NetBuilder;

        #[async_trait]
        impl ResourceBuilder for NetBuilder {
            async fn build(&self, locator: &Locator) -> Result<Box<dyn Resource>, FactoryError> {
                Ok(Box::new(NetResource::new(locator.to_string())))
            }
        }

        let mut factory = factory();
        factory.register("https", Arc::new(NetBuilder));
        assert!(factory.has_scheme("https"));

        let resource = factory.create("https://example.com/a").await.unwrap();
        assert_eq!(resource.describe(), "https://example.com/a");
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn duplicate_registration_panics() {
        let mut factory = factory();
        factory.register(GCS_SCHEME, Arc::new(FileBuilder));
    }
}
