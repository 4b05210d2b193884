//! Instruction prompt sent with every scan
//!
//! Defines the exact output JSON schema and the two extraction modes:
//! a printed receipt collapses into a single aggregated item, a handwritten
//! list becomes one item per line. Today's date is embedded as the fallback
//! for receipts with no legible date.

use chrono::NaiveDate;

pub fn instruction_prompt(today: NaiveDate) -> String {
    let hoje = today.format("%Y-%m-%d");
    format!(
        r#"Você é um assistente financeiro de elite. Sua tarefa é converter imagens em JSON estruturado com base no TIPO de imagem.

EXEMPLO 1 (CUPOM FISCAL / NOTA):
- Entrada: Imagem de um cupom de supermercado ou farmácia.
- Ação: Agrupar TUDO em um único item.
- Resultado Itens: [{{ "Descricao": "Compras - [Nome]", "Valor": [Total], "CategoriaSugerida": "Mercado", "Tipo": "Saida" }}]

EXEMPLO 2 (LISTA MANUSCRITA / CADERNO):
- Entrada: Foto de uma lista escrita à mão.
- Ação: Detalhar cada linha da lista.
- Resultado Itens: [{{ "Descricao": "Item 1", ... }}, {{ "Descricao": "Item 2", ... }}]

REGRAS RÍGIDAS:
1. SE FOR CUPOM FISCAL: A lista 'Itens' deve conter EXATAMENTE 1 ITEM com o valor total da nota. Use a categoria que melhor descreve a loja (Mercado, Farmácia, Restaurante, Combustível).
2. SE FOR LISTA MANUAL: Transcreva cada linha como um item separado.
3. DATA: Formato YYYY-MM-DD. Se ausente ou ilegível na imagem, use OBRIGATORIAMENTE a data de hoje: {hoje}.
4. VALORES (Decimal vs Inteiro): Se um número NÃO tiver separador (vírgula ou ponto), trate como VALOR INTEIRO. Exemplo: '1300' é 1300.00, não 13.00. Use decimais apenas se houver separador explícito na imagem.
5. JSON: Retorne APENAS o JSON, sem explicações.

OUTPUT SCHEMA:
{{
  "nomeLista": "Titulo Curto",
  "data": "YYYY-MM-DD",
  "totalEstimado": 0.00,
  "itens": [
    {{ "descricao": "Nome Item", "valor": 0.00, "categoriaSugerida": "Categoria", "tipo": "Saida" }}
  ]
}}"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_embeds_today_as_date_fallback() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 23).unwrap();
        let prompt = instruction_prompt(today);

        assert!(prompt.contains("2026-08-23"));
        assert!(prompt.contains("nomeLista"));
        assert!(prompt.contains("categoriaSugerida"));
    }
}
