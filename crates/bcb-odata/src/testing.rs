//! Fixtures and a recording transport shared by the unit tests.

use async_trait::async_trait;
use bcb_core::{BcbError, Headers, Result, Transport};
use std::sync::Mutex;

pub(crate) const EXPECTATIVAS_METADATA: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<edmx:Edmx Version="4.0" xmlns:edmx="http://docs.oasis-open.org/odata/ns/edmx">
  <edmx:DataServices>
    <Schema Namespace="IFBCB_DadosSeries_v2" xmlns="http://docs.oasis-open.org/odata/ns/edm">
      <EntityType Name="Expectativa">
        <Property Name="Indicador" Type="Edm.String"/>
        <Property Name="Data" Type="Edm.Date"/>
        <Property Name="Mediana" Type="Edm.Decimal"/>
      </EntityType>
      <EntityContainer Name="IFBCB_DadosSeries_v2">
        <EntitySet Name="ExpectativasMercadoAnuais"
                   EntityType="IFBCB_DadosSeries_v2.Expectativa"/>
      </EntityContainer>
    </Schema>
  </edmx:DataServices>
</edmx:Edmx>"#;

pub(crate) const PTAX_METADATA: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<edmx:Edmx Version="4.0" xmlns:edmx="http://docs.oasis-open.org/odata/ns/edmx">
  <edmx:DataServices>
    <Schema Namespace="br.gov.bcb.olinda.servico.PTAX" xmlns="http://docs.oasis-open.org/odata/ns/edm">
      <EntityType Name="Moeda">
        <Key><PropertyRef Name="simbolo"/></Key>
        <Property Name="simbolo" Type="Edm.String"/>
        <Property Name="nomeFormatado" Type="Edm.String"/>
        <Property Name="tipoMoeda" Type="Edm.String"/>
      </EntityType>
      <EntityType Name="CotacaoDolar">
        <Property Name="cotacaoCompra" Type="Edm.Decimal"/>
        <Property Name="cotacaoVenda" Type="Edm.Decimal"/>
        <Property Name="dataHoraCotacao" Type="Edm.String"/>
      </EntityType>
      <Function Name="CotacaoDolarPeriodo">
        <Parameter Name="dataInicial" Type="Edm.String" Nullable="false"/>
        <Parameter Name="dataFinalCotacao" Type="Edm.String"/>
        <Parameter Name="casas" Type="Edm.Int32" Nullable="true"/>
        <ReturnType Type="Collection(br.gov.bcb.olinda.servico.PTAX.CotacaoDolar)"/>
      </Function>
      <EntityContainer Name="PTAX">
        <EntitySet Name="Moedas" EntityType="br.gov.bcb.olinda.servico.PTAX.Moeda"/>
        <FunctionImport Name="CotacaoDolarPeriodo"
                        Function="br.gov.bcb.olinda.servico.PTAX.CotacaoDolarPeriodo"
                        EntitySet="br.gov.bcb.olinda.servico.PTAX._CotacaoDolarPeriodo"/>
        <EntitySet Name="_CotacaoDolarPeriodo" EntityType="br.gov.bcb.olinda.servico.PTAX.CotacaoDolar"/>
      </EntityContainer>
    </Schema>
  </edmx:DataServices>
</edmx:Edmx>"#;

pub(crate) const QUERY_RESPONSE: &str =
    r#"{"value":[{"Indicador":"IPCA","Data":"2021-01-04","Mediana":4.5}]}"#;

/// Service root document whose metadata lives at `metadata_url`.
pub(crate) fn service_root(metadata_url: &str, endpoints: &[(&str, &str)]) -> String {
    let value = endpoints
        .iter()
        .map(|(name, kind)| format!(r#"{{"name":"{name}","kind":"{kind}","url":"{name}"}}"#))
        .collect::<Vec<_>>()
        .join(",");
    format!(r#"{{"@odata.context":"{metadata_url}","value":[{value}]}}"#)
}

/// Answers every GET with the same body and records the requested URLs.
#[derive(Debug, Default)]
pub(crate) struct RecordingTransport {
    body: String,
    urls: Mutex<Vec<String>>,
}

impl RecordingTransport {
    pub(crate) fn new(body: &str) -> Self {
        Self {
            body: body.to_string(),
            urls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn get_text(&self, url: &str, _headers: Headers<'_>) -> Result<String> {
        self.urls
            .lock()
            .map_err(|e| BcbError::Network(e.to_string()))?
            .push(url.to_string());
        Ok(self.body.clone())
    }
}
