//! GraphQL documents used by the push and pull engines.

pub const CUSTOMER_CREATE: &str = r"
mutation customerCreate($input: CustomerInput!) {
  customerCreate(input: $input) {
    customer { id }
    userErrors { field message }
  }
}";

pub const CUSTOMER_UPDATE: &str = r"
mutation customerUpdate($input: CustomerInput!) {
  customerUpdate(input: $input) {
    customer { id }
    userErrors { field message }
  }
}";

pub const ADDRESS_CREATE: &str = r"
mutation customerAddressCreate($customerId: ID!, $address: MailingAddressInput!) {
  customerAddressCreate(customerId: $customerId, address: $address) {
    address { id }
    userErrors { field message }
  }
}";

pub const ADDRESS_UPDATE: &str = r"
mutation customerAddressUpdate($customerId: ID!, $addressId: ID!, $address: MailingAddressInput!) {
  customerAddressUpdate(customerId: $customerId, addressId: $addressId, address: $address) {
    address { id }
    userErrors { field message }
  }
}";

pub const ADDRESS_SET_DEFAULT: &str = r"
mutation customerUpdateDefaultAddress($customerId: ID!, $addressId: ID!) {
  customerUpdateDefaultAddress(customerId: $customerId, addressId: $addressId) {
    customer { id }
    userErrors { field message }
  }
}";

pub const PRODUCT_CREATE: &str = r"
mutation productCreate($product: ProductCreateInput!) {
  productCreate(product: $product) {
    product { id }
    userErrors { field message }
  }
}";

pub const PRODUCT_UPDATE: &str = r"
mutation productUpdate($product: ProductUpdateInput!) {
  productUpdate(product: $product) {
    product { id }
    userErrors { field message }
  }
}";

pub const INVENTORY_ACTIVATE: &str = r"
mutation inventoryActivate($inventoryItemId: ID!, $locationId: ID!, $available: Int) {
  inventoryActivate(inventoryItemId: $inventoryItemId, locationId: $locationId, available: $available) {
    inventoryLevel { id }
    userErrors { field message }
  }
}";

pub const INVENTORY_SET_QUANTITIES: &str = r"
mutation inventorySetQuantities($input: InventorySetQuantitiesInput!) {
  inventorySetQuantities(input: $input) {
    inventoryAdjustmentGroup { id }
    userErrors { field message }
  }
}";

pub const SELLING_PLAN_GROUP_CREATE: &str = r"
mutation sellingPlanGroupCreate($input: SellingPlanGroupInput!, $resources: SellingPlanGroupResourceInput) {
  sellingPlanGroupCreate(input: $input, resources: $resources) {
    sellingPlanGroup {
      id
      sellingPlans(first: 1) { nodes { id } }
    }
    userErrors { field message }
  }
}";

pub const SELLING_PLAN_GROUP_UPDATE: &str = r"
mutation sellingPlanGroupUpdate($id: ID!, $input: SellingPlanGroupInput!) {
  sellingPlanGroupUpdate(id: $id, input: $input) {
    sellingPlanGroup {
      id
      sellingPlans(first: 1) { nodes { id } }
      products(first: 250) { nodes { id } }
    }
    userErrors { field message }
  }
}";

pub const SELLING_PLAN_GROUP_ADD_PRODUCTS: &str = r"
mutation sellingPlanGroupAddProducts($id: ID!, $productIds: [ID!]!) {
  sellingPlanGroupAddProducts(id: $id, productIds: $productIds) {
    sellingPlanGroup { id }
    userErrors { field message }
  }
}";

pub const SELLING_PLAN_GROUP_REMOVE_PRODUCTS: &str = r"
mutation sellingPlanGroupRemoveProducts($id: ID!, $productIds: [ID!]!) {
  sellingPlanGroupRemoveProducts(id: $id, productIds: $productIds) {
    removedProductIds
    userErrors { field message }
  }
}";

pub const CUSTOMERS_PAGE: &str = r"
query customers($first: Int!, $after: String, $query: String) {
  customers(first: $first, after: $after, query: $query) {
    nodes { id email firstName lastName phone note tags }
    pageInfo { hasNextPage endCursor }
  }
}";

pub const CUSTOMER_ADDRESSES_PAGE: &str = r"
query customerAddresses($first: Int!, $after: String, $query: String) {
  customers(first: $first, after: $after, query: $query) {
    nodes {
      id
      defaultAddress { id }
      addresses {
        id firstName lastName company address1 address2
        city provinceCode zip countryCodeV2 phone
      }
    }
    pageInfo { hasNextPage endCursor }
  }
}";

pub const PRODUCTS_PAGE: &str = r"
query products($first: Int!, $after: String, $query: String) {
  products(first: $first, after: $after, query: $query) {
    nodes { id title handle descriptionHtml vendor productType status tags }
    pageInfo { hasNextPage endCursor }
  }
}";

pub const INVENTORY_PAGE: &str = r#"
query inventoryItems($first: Int!, $after: String, $query: String) {
  inventoryItems(first: $first, after: $after, query: $query) {
    nodes {
      id
      sku
      inventoryLevels(first: 50) {
        nodes {
          id
          location { id }
          quantities(names: ["available"]) { name quantity }
        }
      }
    }
    pageInfo { hasNextPage endCursor }
  }
}"#;

pub const SELLING_PLANS_PAGE: &str = r"
query sellingPlanGroups($first: Int!, $after: String, $query: String) {
  sellingPlanGroups(first: $first, after: $after, query: $query) {
    nodes {
      id
      name
      merchantCode
      description
      sellingPlans(first: 1) {
        nodes {
          id
          billingPolicy {
            ... on SellingPlanRecurringBillingPolicy { interval intervalCount }
          }
          pricingPolicies {
            ... on SellingPlanFixedPricingPolicy {
              adjustmentValue {
                ... on SellingPlanPricingPolicyPercentageValue { percentage }
              }
            }
          }
        }
      }
      products(first: 50) { nodes { id } }
    }
    pageInfo { hasNextPage endCursor }
  }
}";
