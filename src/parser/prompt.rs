//! Builds the instructions sent to the completion service.

use crate::transaction::{EXPENSE_CATEGORIES, INCOME_CATEGORIES};

/// Build the system prompt that tells the completion service how to turn
/// free text into the JSON document understood by the parser.
///
/// `default_currency` is the currency the service should use when the text
/// does not mention one.
pub fn build_system_prompt(default_currency: &str) -> String {
    let expense_categories = EXPENSE_CATEGORIES.join(", ");
    let income_categories = INCOME_CATEGORIES.join(", ");

    format!(
        r#"You are a financial transaction parser. Parse the given text into structured transaction data.

Available categories:
- Expense: {expense_categories}
- Income: {income_categories}

Return a JSON object with the following structure:
{{
  "transactions": [
    {{
      "amount": 25.50,
      "currency": "{default_currency}",
      "category": "food",
      "type": "expense",
      "date": "2024-01-15T12:00:00Z",
      "vendor": "Restaurant Name",
      "description": "Lunch at restaurant"
    }}
  ]
}}

Rules:
1. If no date is specified, use the current date
2. Default currency is {default_currency} if not specified
3. Amount should be positive (the type field indicates income/expense)
4. Choose the most appropriate category from the available list
5. Extract vendor name from the text
6. If multiple transactions are mentioned, create separate objects for each

Parse this text:"#
    )
}
