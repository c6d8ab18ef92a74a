// ============================================================================
// Broker Topology Registry
// ============================================================================
//
// Static description of exchanges, queues and bindings, validated once at
// construction and immutable afterwards. Pure data + lookup: the registry
// never touches the network. The connection manager replays it against the
// broker on every (re)connect so producer and consumer sides always agree.
//
// ============================================================================

use std::collections::{HashMap, HashSet};

use crate::error::{AppError, AppResult};
use crate::rabbitmq::types::MessageCategory;

/// Exchange kind (subset of AMQP exchange types this application uses)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeType {
    Topic,
    Direct,
    Fanout,
}

impl ExchangeType {
    pub(crate) fn as_lapin(&self) -> lapin::ExchangeKind {
        match self {
            ExchangeType::Topic => lapin::ExchangeKind::Topic,
            ExchangeType::Direct => lapin::ExchangeKind::Direct,
            ExchangeType::Fanout => lapin::ExchangeKind::Fanout,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExchangeDescriptor {
    /// Globally unique within the registry
    pub name: String,
    /// Fixed for the exchange's lifetime
    pub kind: ExchangeType,
    pub durable: bool,
}

#[derive(Debug, Clone)]
pub struct QueueDescriptor {
    /// Globally unique within the registry
    pub name: String,
    pub durable: bool,
}

/// Rule connecting an exchange to a queue via a routing-key pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingDescriptor {
    pub exchange: String,
    pub queue: String,
    pub routing_pattern: String,
}

/// Category-to-exchange mapping with the category's default routing key
#[derive(Debug, Clone)]
pub struct CategoryRoute {
    pub category: MessageCategory,
    pub exchange: String,
    pub default_routing_key: String,
}

/// Validated, immutable topology lookup table
#[derive(Debug)]
pub struct TopologyRegistry {
    exchanges: Vec<ExchangeDescriptor>,
    queues: Vec<QueueDescriptor>,
    bindings: Vec<BindingDescriptor>,
    routes: HashMap<MessageCategory, CategoryRoute>,
}

impl TopologyRegistry {
    /// Build a registry, rejecting malformed topologies.
    ///
    /// Fails with `DuplicateBinding` on a repeated (exchange, queue, pattern)
    /// triple and with `DanglingReference` when a binding or category route
    /// names an exchange/queue that is not registered.
    pub fn new(
        exchanges: Vec<ExchangeDescriptor>,
        queues: Vec<QueueDescriptor>,
        bindings: Vec<BindingDescriptor>,
        routes: Vec<CategoryRoute>,
    ) -> AppResult<Self> {
        let mut exchange_names = HashSet::new();
        for exchange in &exchanges {
            if !exchange_names.insert(exchange.name.as_str()) {
                return Err(AppError::config(format!(
                    "duplicate exchange name: {}",
                    exchange.name
                )));
            }
        }

        let mut queue_names = HashSet::new();
        for queue in &queues {
            if !queue_names.insert(queue.name.as_str()) {
                return Err(AppError::config(format!(
                    "duplicate queue name: {}",
                    queue.name
                )));
            }
        }

        let mut seen_bindings = HashSet::new();
        for binding in &bindings {
            if !exchange_names.contains(binding.exchange.as_str()) {
                return Err(AppError::DanglingReference(binding.exchange.clone()));
            }
            if !queue_names.contains(binding.queue.as_str()) {
                return Err(AppError::DanglingReference(binding.queue.clone()));
            }
            let key = (
                binding.exchange.as_str(),
                binding.queue.as_str(),
                binding.routing_pattern.as_str(),
            );
            if !seen_bindings.insert(key) {
                return Err(AppError::DuplicateBinding {
                    exchange: binding.exchange.clone(),
                    queue: binding.queue.clone(),
                    pattern: binding.routing_pattern.clone(),
                });
            }
        }

        let mut route_map = HashMap::new();
        for route in routes {
            if !exchange_names.contains(route.exchange.as_str()) {
                return Err(AppError::DanglingReference(route.exchange.clone()));
            }
            if route_map.insert(route.category, route.clone()).is_some() {
                return Err(AppError::config(format!(
                    "category {} mapped to more than one exchange",
                    route.category
                )));
            }
        }

        Ok(Self {
            exchanges,
            queues,
            bindings,
            routes: route_map,
        })
    }

    /// The application's standard topology: one durable topic exchange, one
    /// durable queue and one wildcard binding per message category
    /// (user-exchange / user-queue / "user.*", and so on).
    pub fn standard() -> AppResult<Self> {
        let mut exchanges = Vec::new();
        let mut queues = Vec::new();
        let mut bindings = Vec::new();
        let mut routes = Vec::new();

        for category in MessageCategory::ALL {
            let exchange = format!("{}-exchange", category.as_str());
            let queue = format!("{}-queue", category.as_str());

            exchanges.push(ExchangeDescriptor {
                name: exchange.clone(),
                kind: ExchangeType::Topic,
                durable: true,
            });
            queues.push(QueueDescriptor {
                name: queue.clone(),
                durable: true,
            });
            bindings.push(BindingDescriptor {
                exchange: exchange.clone(),
                queue,
                routing_pattern: format!("{}.*", category.as_str()),
            });
            routes.push(CategoryRoute {
                category,
                exchange,
                default_routing_key: category.default_routing_key().to_string(),
            });
        }

        Self::new(exchanges, queues, bindings, routes)
    }

    /// Exchange a category publishes to.
    pub fn resolve_exchange(&self, category: MessageCategory) -> AppResult<&ExchangeDescriptor> {
        let route = self
            .routes
            .get(&category)
            .ok_or_else(|| AppError::UnknownCategory(category.to_string()))?;

        // Validated at construction; routes only reference registered exchanges.
        self.exchanges
            .iter()
            .find(|e| e.name == route.exchange)
            .ok_or_else(|| AppError::UnknownCategory(category.to_string()))
    }

    /// Routing key used for a category when the caller does not override it.
    pub fn default_routing_key(&self, category: MessageCategory) -> AppResult<&str> {
        self.routes
            .get(&category)
            .map(|r| r.default_routing_key.as_str())
            .ok_or_else(|| AppError::UnknownCategory(category.to_string()))
    }

    pub fn list_bindings(&self) -> &[BindingDescriptor] {
        &self.bindings
    }

    pub fn exchanges(&self) -> &[ExchangeDescriptor] {
        &self.exchanges
    }

    pub fn queues(&self) -> &[QueueDescriptor] {
        &self.queues
    }

    pub fn has_queue(&self, name: &str) -> bool {
        self.queues.iter().any(|q| q.name == name)
    }

    pub fn has_exchange(&self, name: &str) -> bool {
        self.exchanges.iter().any(|e| e.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exchange(name: &str) -> ExchangeDescriptor {
        ExchangeDescriptor {
            name: name.to_string(),
            kind: ExchangeType::Topic,
            durable: true,
        }
    }

    fn queue(name: &str) -> QueueDescriptor {
        QueueDescriptor {
            name: name.to_string(),
            durable: true,
        }
    }

    fn binding(exchange: &str, queue: &str, pattern: &str) -> BindingDescriptor {
        BindingDescriptor {
            exchange: exchange.to_string(),
            queue: queue.to_string(),
            routing_pattern: pattern.to_string(),
        }
    }

    #[test]
    fn test_standard_topology_is_valid() {
        let registry = TopologyRegistry::standard().unwrap();
        assert_eq!(registry.exchanges().len(), 4);
        assert_eq!(registry.queues().len(), 4);
        assert_eq!(registry.list_bindings().len(), 4);
    }

    #[test]
    fn test_resolve_exchange_is_total_over_categories() {
        let registry = TopologyRegistry::standard().unwrap();
        for category in MessageCategory::ALL {
            let exchange = registry.resolve_exchange(category).unwrap();
            assert_eq!(exchange.name, format!("{}-exchange", category.as_str()));
            assert!(exchange.durable);
        }
    }

    #[test]
    fn test_unknown_category_is_rejected() {
        // A registry that only routes User messages
        let registry = TopologyRegistry::new(
            vec![exchange("user-exchange")],
            vec![queue("user-queue")],
            vec![binding("user-exchange", "user-queue", "user.*")],
            vec![CategoryRoute {
                category: MessageCategory::User,
                exchange: "user-exchange".to_string(),
                default_routing_key: "user.created".to_string(),
            }],
        )
        .unwrap();

        assert!(registry.resolve_exchange(MessageCategory::User).is_ok());
        assert!(matches!(
            registry.resolve_exchange(MessageCategory::Email),
            Err(AppError::UnknownCategory(_))
        ));
        assert!(matches!(
            registry.default_routing_key(MessageCategory::Log),
            Err(AppError::UnknownCategory(_))
        ));
    }

    #[test]
    fn test_duplicate_binding_is_rejected() {
        let result = TopologyRegistry::new(
            vec![exchange("user-exchange")],
            vec![queue("user-queue")],
            vec![
                binding("user-exchange", "user-queue", "user.*"),
                binding("user-exchange", "user-queue", "user.*"),
            ],
            vec![],
        );

        assert!(matches!(result, Err(AppError::DuplicateBinding { .. })));
    }

    #[test]
    fn test_queue_may_have_multiple_distinct_bindings() {
        let registry = TopologyRegistry::new(
            vec![exchange("user-exchange")],
            vec![queue("user-queue")],
            vec![
                binding("user-exchange", "user-queue", "user.created"),
                binding("user-exchange", "user-queue", "user.deleted"),
            ],
            vec![],
        );

        assert!(registry.is_ok());
    }

    #[test]
    fn test_dangling_binding_is_rejected() {
        let result = TopologyRegistry::new(
            vec![exchange("user-exchange")],
            vec![queue("user-queue")],
            vec![binding("ghost-exchange", "user-queue", "user.*")],
            vec![],
        );
        assert!(matches!(result, Err(AppError::DanglingReference(_))));

        let result = TopologyRegistry::new(
            vec![exchange("user-exchange")],
            vec![queue("user-queue")],
            vec![binding("user-exchange", "ghost-queue", "user.*")],
            vec![],
        );
        assert!(matches!(result, Err(AppError::DanglingReference(_))));
    }

    #[test]
    fn test_duplicate_names_are_rejected() {
        let result = TopologyRegistry::new(
            vec![exchange("user-exchange"), exchange("user-exchange")],
            vec![],
            vec![],
            vec![],
        );
        assert!(result.is_err());

        let result = TopologyRegistry::new(
            vec![],
            vec![queue("user-queue"), queue("user-queue")],
            vec![],
            vec![],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_standard_default_routing_keys() {
        let registry = TopologyRegistry::standard().unwrap();
        assert_eq!(
            registry.default_routing_key(MessageCategory::User).unwrap(),
            "user.created"
        );
        assert_eq!(
            registry
                .default_routing_key(MessageCategory::Notification)
                .unwrap(),
            "notification.sent"
        );
    }
}
