//! GraphQL documents sent to the Admin API. Every input travels as a variable.

pub(super) const SHOP: &str = r"
query Shop {
  shop {
    name
    currencyCode
    plan {
      displayName
    }
  }
}
";

pub(super) const AUTOMATIC_DISCOUNTS: &str = r"
query AutomaticDiscounts($first: Int!, $after: String) {
  automaticDiscountNodes(first: $first, after: $after) {
    edges {
      node {
        id
        automaticDiscount {
          ... on DiscountAutomaticBasic {
            title
            status
            createdAt
            customerGets {
              value {
                ... on DiscountPercentage {
                  percentage
                }
                ... on DiscountAmount {
                  amount {
                    amount
                    currencyCode
                  }
                }
              }
            }
          }
          ... on DiscountAutomaticBxgy {
            title
            status
            createdAt
          }
          ... on DiscountAutomaticFreeShipping {
            title
            status
            createdAt
          }
        }
      }
    }
    pageInfo {
      hasNextPage
      endCursor
    }
  }
}
";

pub(super) const CODE_DISCOUNTS: &str = r"
query CodeDiscounts($first: Int!, $after: String) {
  codeDiscountNodes(first: $first, after: $after) {
    edges {
      node {
        id
        codeDiscount {
          ... on DiscountCodeBasic {
            title
            status
            createdAt
            codes(first: 1) {
              edges {
                node {
                  code
                }
              }
            }
            customerGets {
              value {
                ... on DiscountPercentage {
                  percentage
                }
                ... on DiscountAmount {
                  amount {
                    amount
                    currencyCode
                  }
                }
              }
            }
          }
          ... on DiscountCodeBxgy {
            title
            status
            createdAt
            codes(first: 1) {
              edges {
                node {
                  code
                }
              }
            }
          }
          ... on DiscountCodeFreeShipping {
            title
            status
            createdAt
            codes(first: 1) {
              edges {
                node {
                  code
                }
              }
            }
          }
        }
      }
    }
    pageInfo {
      hasNextPage
      endCursor
    }
  }
}
";

pub(super) const CREATE_AUTOMATIC: &str = r"
mutation CreateAutomaticDiscount($discount: DiscountAutomaticBasicInput!) {
  discountAutomaticBasicCreate(automaticBasicDiscount: $discount) {
    automaticDiscountNode {
      id
      automaticDiscount {
        ... on DiscountAutomaticBasic {
          title
          status
          createdAt
          customerGets {
            value {
              ... on DiscountPercentage {
                percentage
              }
              ... on DiscountAmount {
                amount {
                  amount
                  currencyCode
                }
              }
            }
          }
        }
      }
    }
    userErrors {
      field
      code
      message
    }
  }
}
";

pub(super) const CREATE_CODE: &str = r"
mutation CreateCodeDiscount($discount: DiscountCodeBasicInput!) {
  discountCodeBasicCreate(basicCodeDiscount: $discount) {
    codeDiscountNode {
      id
      codeDiscount {
        ... on DiscountCodeBasic {
          title
          status
          createdAt
          codes(first: 1) {
            edges {
              node {
                code
              }
            }
          }
          customerGets {
            value {
              ... on DiscountPercentage {
                percentage
              }
              ... on DiscountAmount {
                amount {
                  amount
                  currencyCode
                }
              }
            }
          }
        }
      }
    }
    userErrors {
      field
      code
      message
    }
  }
}
";

pub(super) const DELETE_AUTOMATIC: &str = r"
mutation DeleteAutomaticDiscount($id: ID!) {
  discountAutomaticDelete(id: $id) {
    deletedAutomaticDiscountId
    userErrors {
      field
      code
      message
    }
  }
}
";

pub(super) const DELETE_CODE: &str = r"
mutation DeleteCodeDiscount($id: ID!) {
  discountCodeDelete(id: $id) {
    deletedCodeDiscountId
    userErrors {
      field
      code
      message
    }
  }
}
";
